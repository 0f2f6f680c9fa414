use bytes::{BufMut, BytesMut};
use http::{HeaderName, HeaderValue};

/// An ordered list of header fields.
///
/// Unlike a map, entries keep the order they were added in and a name may appear
/// more than once. Lookups compare names case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueList {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl KeyValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Appends a header, validating both name and value.
    pub fn add<K, V>(&mut self, name: K, value: V) -> Result<&mut Self, http::Error>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = HeaderName::try_from(name).map_err(Into::into)?;
        let value = HeaderValue::try_from(value).map_err(Into::into)?;
        self.entries.push((name, value));
        Ok(self)
    }

    #[inline]
    pub fn push(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.push((name, value));
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.iter().find(|(n, _)| n.as_str().eq_ignore_ascii_case(name)).map(|(_, v)| v)
    }

    /// First value stored under `name`, if it is visible ASCII.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn get_all<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a HeaderValue> + use<'a, 'n> {
        self.entries.iter().filter(move |(n, _)| n.as_str().eq_ignore_ascii_case(name)).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether any comma separated element of the `name` headers equals `token`, ignoring case.
    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name)
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|element| element.trim().eq_ignore_ascii_case(token))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes every entry as a `name: value\r\n` line.
    pub fn append_to(&self, dst: &mut BytesMut) {
        for (name, value) in &self.entries {
            dst.put_slice(name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(value.as_ref());
            dst.put_slice(b"\r\n");
        }
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for KeyValueList {
    fn from_iter<T: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_keeps_order() {
        let mut headers = KeyValueList::new();
        headers.add("Set-Cookie", "a=1").unwrap().add("Host", "localhost").unwrap().add("set-cookie", "b=2").unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get_str("HOST"), Some("localhost"));
        let cookies: Vec<_> = headers.get_all("SET-COOKIE").map(|v| v.to_str().unwrap()).collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);

        let names: Vec<_> = headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["set-cookie", "host", "set-cookie"]);
    }

    #[test]
    fn lookup_result_outlives_name() {
        let mut headers = KeyValueList::new();
        headers.add("Content-Type", "text/plain").unwrap();

        let value = {
            let name = String::from("content-type");
            headers.get(&name)
        };
        assert_eq!(value.map(HeaderValue::as_bytes), Some(&b"text/plain"[..]));

        let values: Vec<_> = {
            let name = String::from("CONTENT-TYPE");
            headers.get_all(&name).collect::<Vec<_>>()
        };
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn token_matching() {
        let mut headers = KeyValueList::new();
        headers.add("Connection", "keep-alive, Upgrade").unwrap();
        assert!(headers.contains_token("connection", "upgrade"));
        assert!(!headers.contains_token("connection", "close"));
    }

    #[test]
    fn rejects_invalid_name() {
        let mut headers = KeyValueList::new();
        assert!(headers.add("bad header", "x").is_err());
        assert!(headers.is_empty());
    }

    #[test]
    fn append_writes_lines() {
        let mut headers = KeyValueList::new();
        headers.add("X-A", "1").unwrap().add("X-B", "2").unwrap();
        let mut dst = BytesMut::new();
        headers.append_to(&mut dst);
        assert_eq!(&dst[..], b"x-a: 1\r\nx-b: 2\r\n");
    }
}
