//! Inputs shared by the benchmarks.

/// A named benchmark input.
#[derive(Debug, Clone)]
pub struct Fixture {
    name: &'static str,
    bytes: Vec<u8>,
}

impl Fixture {
    pub fn new(name: &'static str, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name, bytes: bytes.into() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub const SMALL_GET: &str = "GET / HTTP/1.1\r\nHost: 127.0.0.1:8080\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n";

pub const LARGE_GET: &str = "GET /websockets/echo?session=8f14e45fceea167a5a36dedd4bea2543 HTTP/1.1\r\n\
Host: www.example.com\r\n\
Connection: keep-alive\r\n\
Cache-Control: max-age=0\r\n\
sec-ch-ua: \"Chromium\";v=\"128\", \"Not;A=Brand\";v=\"24\", \"Google Chrome\";v=\"128\"\r\n\
sec-ch-ua-mobile: ?0\r\n\
sec-ch-ua-platform: \"macOS\"\r\n\
Upgrade-Insecure-Requests: 1\r\n\
User-Agent: Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36\r\n\
Accept: text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8\r\n\
Sec-Fetch-Site: none\r\n\
Sec-Fetch-Mode: navigate\r\n\
Sec-Fetch-User: ?1\r\n\
Sec-Fetch-Dest: document\r\n\
Accept-Encoding: gzip, deflate, br, zstd\r\n\
Accept-Language: en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7\r\n\
Cookie: _ga=GA1.1.1195284813.1718002342; _ga_ABCDEFGHIJ=GS1.1.1725432109.12.1.1725432345.0.0.0; theme=dark; sidebar=collapsed\r\n\
If-None-Match: W/\"5f3c-18e9a2b1c40\"\r\n\
If-Modified-Since: Tue, 03 Sep 2024 08:15:42 GMT\r\n\
\r\n";

/// A `POST` whose `Content-Length` body is `body_len` bytes of `x`.
pub fn post_with_body(body_len: usize) -> Vec<u8> {
    let mut request =
        format!("POST /submit HTTP/1.1\r\nHost: 127.0.0.1:8080\r\nContent-Type: text/plain\r\nContent-Length: {body_len}\r\n\r\n")
            .into_bytes();
    request.resize(request.len() + body_len, b'x');
    request
}

pub fn request_fixtures() -> Vec<Fixture> {
    vec![
        Fixture::new("small_get", SMALL_GET),
        Fixture::new("large_get", LARGE_GET),
        Fixture::new("post_4k_body", post_with_body(4096)),
    ]
}

const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

/// A final client frame: masked, with the shortest length encoding for `payload_len`.
pub fn masked_frame(opcode: u8, payload_len: usize) -> Vec<u8> {
    let mut frame = vec![0x80 | opcode];
    match payload_len {
        0..=125 => frame.push(0x80 | payload_len as u8),
        126..=0xffff => {
            frame.push(0x80 | 126);
            frame.extend_from_slice(&(payload_len as u16).to_be_bytes());
        }
        _ => {
            frame.push(0x80 | 127);
            frame.extend_from_slice(&(payload_len as u64).to_be_bytes());
        }
    }
    frame.extend_from_slice(&MASK);
    frame.extend((0..payload_len).map(|i| b'a' ^ MASK[i % 4]));
    frame
}

pub fn frame_fixtures() -> Vec<Fixture> {
    vec![
        Fixture::new("text_16b", masked_frame(0x1, 16)),
        Fixture::new("binary_4k", masked_frame(0x2, 4 * 1024)),
        Fixture::new("binary_128k", masked_frame(0x2, 128 * 1024)),
    ]
}
