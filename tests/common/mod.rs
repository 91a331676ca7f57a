#![allow(dead_code)]

pub mod exchange {
    use std::io;
    use std::sync::{Arc, Mutex};

    use http::{Method, Request};
    use lr::{BufferedResponse, Context, Dispatcher, ResponseSink};

    /// Build a bodiless request.
    pub fn request(method: Method, uri: &str) -> Request<Vec<u8>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    /// Build an urlencoded form request.
    pub fn form_request(method: Method, uri: &str, body: &str) -> Request<Vec<u8>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body.as_bytes().to_vec())
            .unwrap()
    }

    /// Build a JSON request.
    pub fn json_request(method: Method, uri: &str, body: &str) -> Request<Vec<u8>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.as_bytes().to_vec())
            .unwrap()
    }

    /// Dispatch `req` into a fresh buffered sink and hand back both.
    pub fn run(dispatcher: &Dispatcher, req: Request<Vec<u8>>) -> (io::Result<()>, BufferedResponse) {
        let mut out = BufferedResponse::new();
        let result = {
            let mut ctx = Context::new(req, &mut out);
            dispatcher.dispatch(&mut ctx)
        };
        (result, out)
    }

    /// Shared list that middleware and handlers append markers to.
    #[derive(Clone, Default)]
    pub struct Trace(Arc<Mutex<Vec<String>>>);

    impl Trace {
        pub fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        pub fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    /// Sink that accepts at most `limit` body bytes per write.
    #[derive(Debug, Default)]
    pub struct ShortSink {
        pub limit: usize,
        pub status: Option<u16>,
        pub body: Vec<u8>,
    }

    impl ResponseSink for ShortSink {
        fn write_status(&mut self, status: u16) {
            self.status = Some(status);
        }

        fn set_header(&mut self, _name: &str, _value: &str) {}

        fn append_header(&mut self, _name: &str, _value: &str) {}

        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let n = data.len().min(self.limit);
            self.body.extend_from_slice(&data[..n]);
            Ok(n)
        }
    }
}

pub mod wire {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Send a raw HTTP/1.1 request and read the whole response.
    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(2000)))
            .unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Split a raw response into status, lower-cased headers and body.
    pub fn parse_parts(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let mut parts = resp.splitn(2, "\r\n\r\n");
        let head = parts.next().unwrap_or("");
        let body = parts.next().unwrap_or("").to_string();
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        (status, headers, body)
    }

    pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
