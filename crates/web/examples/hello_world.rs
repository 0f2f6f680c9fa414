use http::StatusCode;
use nio_http::codec::{HttpResponse, HttpResponseExt};
use nio_http::handler::{NoSession, handler_fn};
use nio_http::protocol::{Charset, HttpRequest};
use nio_web::decorator::RequestLogDecorator;
use nio_web::{WebServer, WebServerConfigBuilder};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = WebServerConfigBuilder::new(NoSession)
        .add(
            "/",
            handler_fn(|_: &HttpRequest, response: &mut dyn HttpResponse, _: &mut ()| {
                response.send_text(StatusCode::OK, &mime::TEXT_PLAIN, "hello world", Charset::Utf8);
                Ok(())
            }),
        )
        .with_decorator(RequestLogDecorator)
        .build();

    let server = match WebServer::builder(config).address("127.0.0.1:3000").build().map(WebServer::start) {
        Ok(Ok(server)) => server,
        Ok(Err(e)) => {
            error!(cause = %e, "can't start server");
            return;
        }
        Err(e) => {
            error!(cause = %e, "invalid server config");
            return;
        }
    };
    info!(local_addr = %server.local_addr(), "try: curl http://{}/", server.local_addr());

    let _ = tokio::signal::ctrl_c().await;
    server.dispose();
}
