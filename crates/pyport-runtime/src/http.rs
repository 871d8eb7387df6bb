use crate::RuntimeError;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

/// Source of remote payloads (embeddable archives, the pip bootstrap script).
pub trait Downloader: Send + Sync {
    /// Download the whole body of `url` into memory.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RuntimeError>;

    /// Download `url` into `dest`, replacing it. Returns the number of bytes written.
    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, RuntimeError> {
        let body = self.fetch(url)?;
        let mut file = File::create(dest)?;
        file.write_all(&body)?;
        file.sync_all()?;
        Ok(body.len() as u64)
    }
}

/// Blocking HTTP(S) downloader with a single global timeout per request.
///
/// Without an explicit proxy the agent honours `HTTP_PROXY`, `HTTPS_PROXY`
/// and `ALL_PROXY` from the environment.
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self, RuntimeError> {
        let mut builder = ureq::Agent::config_builder().timeout_global(Some(timeout));
        if let Some(url) = proxy {
            let proxy =
                ureq::Proxy::new(url).map_err(|e| RuntimeError::Proxy(format!("{url}: {e}")))?;
            builder = builder.proxy(Some(proxy));
        }
        Ok(Self {
            agent: ureq::Agent::new_with_config(builder.build()),
        })
    }

    /// Downloader that ignores proxy variables from the environment.
    pub fn direct(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .proxy(None)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn open(&self, url: &str) -> Result<impl Read, RuntimeError> {
        let resp = match self.agent.get(url).call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RuntimeError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RuntimeError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RuntimeError::Http(format!("{url}: {e}")));
            }
        };
        Ok(resp.into_body().into_reader())
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, RuntimeError> {
        tracing::debug!("GET {url}");
        let mut reader = self.open(url)?;
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RuntimeError::Http(format!("{url}: {e}")))?;
        tracing::debug!("GET {url}: {} bytes", body.len());
        Ok(body)
    }

    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, RuntimeError> {
        tracing::debug!("GET {url} -> {}", dest.display());
        let mut reader = self.open(url)?;
        let mut file = File::create(dest)?;
        let written = io::copy(&mut reader, &mut file)
            .map_err(|e| RuntimeError::Http(format!("{url}: {e}")))?;
        file.sync_all()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// Serves fixed bodies by path; unknown paths get a 404.
    struct MockServer {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl MockServer {
        fn start(files: &[(&str, &[u8])]) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let files: Arc<HashMap<String, Vec<u8>>> = Arc::new(
                files
                    .iter()
                    .map(|(path, body)| ((*path).to_owned(), body.to_vec()))
                    .collect(),
            );
            let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

            let requests_clone = Arc::clone(&requests);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let files = Arc::clone(&files);
                    let reqs = Arc::clone(&requests_clone);

                    std::thread::spawn(move || {
                        let mut reader = BufReader::new(stream.try_clone().unwrap());
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).is_err() {
                            return;
                        }
                        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                        if parts.len() < 2 {
                            return;
                        }
                        let path = parts[1].to_owned();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                                break;
                            }
                        }
                        reqs.lock().unwrap().push(path.clone());

                        if let Some(body) = files.get(&path) {
                            let head = format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                body.len()
                            );
                            let _ = stream.write_all(head.as_bytes());
                            let _ = stream.write_all(body);
                        } else if path == "/broken" {
                            let _ = stream.write_all(
                                b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            );
                        } else {
                            let _ = stream.write_all(
                                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            );
                        }
                        let _ = stream.flush();
                    });
                }
            });

            MockServer {
                addr,
                _handle: handle,
                requests,
            }
        }

        fn requested_paths(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn downloader() -> HttpDownloader {
        HttpDownloader::direct(Duration::from_secs(5))
    }

    #[test]
    fn fetch_returns_body() {
        let server = MockServer::start(&[("/3.12.1/python.zip", b"zip-bytes")]);
        let body = downloader()
            .fetch(&format!("{}/3.12.1/python.zip", server.addr))
            .unwrap();
        assert_eq!(body, b"zip-bytes");
        assert_eq!(server.requested_paths(), vec!["/3.12.1/python.zip"]);
    }

    #[test]
    fn fetch_missing_is_not_found() {
        let server = MockServer::start(&[]);
        let err = downloader()
            .fetch(&format!("{}/missing.zip", server.addr))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)), "got {err}");
    }

    #[test]
    fn fetch_server_error_is_http_error() {
        let server = MockServer::start(&[]);
        let err = downloader()
            .fetch(&format!("{}/broken", server.addr))
            .unwrap_err();
        assert!(err.to_string().contains("500"), "got {err}");
    }

    #[test]
    fn fetch_unreachable_host_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = downloader()
            .fetch(&format!("http://{addr}/get-pip.py"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Http(_)), "got {err}");
    }

    #[test]
    fn fetch_to_file_streams_body() {
        let server = MockServer::start(&[("/get-pip.py", b"print('bootstrap')\n")]);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("get-pip.py");
        let written = downloader()
            .fetch_to_file(&format!("{}/get-pip.py", server.addr), &dest)
            .unwrap();
        assert_eq!(written, 19);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "print('bootstrap')\n"
        );
    }

    #[test]
    fn invalid_proxy_is_rejected() {
        let result = HttpDownloader::new(Duration::from_secs(1), Some("not a proxy url ::"));
        assert!(matches!(result, Err(RuntimeError::Proxy(_))));
    }
}
