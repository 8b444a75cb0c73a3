use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;
use std::time::Duration;

use nvision_demo::detect::{DetectError, NvisionBackend, NvisionConfig, ObjectDetector};
use nvision_demo::DetectionService;

struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: serde_json::Value,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Serve a single canned HTTP response and hand back what the client sent.
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");
        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header line");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        let length: usize = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(0);
        let mut raw = vec![0u8; length];
        reader.read_exact(&mut raw).expect("request body");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .expect("write response");
        stream.flush().expect("flush");

        CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: serde_json::from_slice(&raw).unwrap_or(serde_json::Value::Null),
        }
    });
    (format!("http://{}/api/v1/object-detection", addr), handle)
}

fn service_for(endpoint: String) -> DetectionService {
    DetectionService::new(0.2, move || {
        let backend = NvisionBackend::new(NvisionConfig {
            api_key: "test-key".into(),
            endpoint,
            timeout: Duration::from_secs(5),
        })?;
        Ok(Box::new(backend) as Box<dyn ObjectDetector>)
    })
}

const RESPONSE: &str = r#"{
    "service_id": "svc-42",
    "detected_objects": [
        {
            "name": "person",
            "parent": "human",
            "confidence": 0.88,
            "bounding_box": { "top": 10, "left": 20, "right": 120, "bottom": 210 }
        },
        {
            "name": "cat",
            "parent": "animal",
            "confidence": 0.54,
            "bounding_box": { "top": 50, "left": 150, "right": 260, "bottom": 200 }
        }
    ]
}"#;

#[test]
fn posts_stripped_image_with_api_key_and_parses_objects() {
    let (endpoint, server) = serve_once("200 OK", RESPONSE);
    let service = service_for(endpoint);

    let result = service
        .detect_image("data:image/jpeg;base64,/9j/4AAQ")
        .expect("detect");
    let request = server.join().expect("server thread");

    assert_eq!(request.request_line, "POST /api/v1/object-detection HTTP/1.1");
    assert_eq!(request.header("authorization"), Some("ApiKey test-key"));
    assert_eq!(request.body["raw_data"], "/9j/4AAQ");
    let configurations = request.body["configurations"]
        .as_array()
        .expect("configurations");
    assert!(configurations.iter().any(|c| {
        c["parameter"] == "OutputCroppedImage" && c["value"] == "false"
    }));
    assert!(configurations.iter().any(|c| {
        c["parameter"] == "ConfidenceThreshold" && c["value"] == "0.2"
    }));

    assert_eq!(result.service_id, "svc-42");
    assert_eq!(result.detected_objects.len(), 2);
    assert_eq!(result.detected_objects[1].parent, "animal");
    assert_eq!(result.detected_objects[0].bounding_box.right, 120.0);
}

#[test]
fn http_errors_become_status_errors() {
    let (endpoint, server) = serve_once("401 Unauthorized", r#"{"message":"bad key"}"#);
    let service = service_for(endpoint);

    let err = service.detect_image("iVBORw0KGgo").unwrap_err();
    server.join().expect("server thread");
    match err {
        DetectError::Status { code, body } => {
            assert_eq!(code, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_decode_error() {
    let (endpoint, server) = serve_once("200 OK", "not json");
    let service = service_for(endpoint);

    let err = service.detect_image("iVBORw0KGgo").unwrap_err();
    server.join().expect("server thread");
    assert!(matches!(err, DetectError::Decode(_)));
}
