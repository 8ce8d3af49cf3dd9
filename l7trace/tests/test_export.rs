use l7trace::export::RequestExporter;
use l7trace_common::{L7Event, MAX_PAYLOAD_SIZE, METHOD_GET, PROTOCOL_HTTP};

fn sample_event(pid: u32, fd: u64, duration_ns: u64, request: &[u8]) -> L7Event {
    let mut payload = [0u8; MAX_PAYLOAD_SIZE];
    let len = request.len().min(MAX_PAYLOAD_SIZE);
    payload[..len].copy_from_slice(&request[..len]);
    L7Event {
        fd,
        pid,
        status: 0,
        duration_ns,
        protocol: PROTOCOL_HTTP,
        method: METHOD_GET,
        _padding: [0; 2],
        payload,
    }
}

#[test]
fn test_export_creates_valid_json() {
    let mut exporter = RequestExporter::new();
    exporter.add_event(&sample_event(100, 5, 5_000_000, b"GET /x HTTP/1.1\r\n\r\n"));
    exporter.add_event(&sample_event(200, 8, 1_200_000, b"GET /y HTTP/1.1\r\n\r\n"));

    let mut buffer = Vec::new();
    exporter.export(&mut buffer).expect("Failed to export requests");

    let json_str = String::from_utf8(buffer).expect("Invalid UTF-8");
    let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("Invalid JSON");

    let requests = parsed["requests"].as_array().expect("requests array missing");
    assert_eq!(requests.len(), 2);

    assert_eq!(requests[0]["pid"], 100);
    assert_eq!(requests[0]["fd"], 5);
    assert_eq!(requests[0]["protocol"], "HTTP");
    assert_eq!(requests[0]["method"], "GET");
    assert_eq!(requests[0]["status"], 0);
    assert_eq!(requests[0]["latency_ns"], 5_000_000);
    assert_eq!(requests[0]["latency_ms"], 5.0);
    assert!(requests[0]["payload"].as_str().unwrap().starts_with("GET /x"));

    assert_eq!(requests[1]["pid"], 200);
}

#[test]
fn test_export_writes_to_file() {
    let mut exporter = RequestExporter::new();
    exporter.add_event(&sample_event(100, 5, 5_000_000, b"GET / HTTP/1.1\r\n\r\n"));

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("requests.json");

    let file = std::fs::File::create(&path).expect("Failed to create file");
    exporter.export(file).expect("Failed to export requests");

    let contents = std::fs::read_to_string(&path).expect("Failed to read export");
    let parsed: serde_json::Value = serde_json::from_str(&contents).expect("Invalid JSON");
    assert_eq!(parsed["requests"].as_array().unwrap().len(), 1);
}
