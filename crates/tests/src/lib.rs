//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置快照测试
//! - 端到端测试：监听 → 存储 → 处理轮次（备份转移 → 解析 → 映射 → 投递，模拟后端）

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CallMode, TransportKind};

    const SAMPLE: &str = r#"
[listener]
transport = "serial"
serial_port = "/dev/ttyUSB0"
baud_rate = 9600
file_prefix = "advia"

[directories]
input = "data/astm"
processed = "data/astm_processed"
backup = "data/astm_backup"
backup_processed = "data/astm_backup_processed"

[delivery]
user_name = "tech@PMA_00001"
token_env = "ASTM_BRIDGE_TOKEN"

[mapping]
call_mode = "UPDATE_TEST"
test_id = "T-100"

[mapping.test_names]
PLT = "Platelet Count"
"#;

    #[test]
    fn test_sample_config_round_trips() {
        let blueprint = ConfigLoader::load_from_str(SAMPLE, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.listener.transport, TransportKind::Serial);
        assert_eq!(blueprint.mapping.call_mode, CallMode::UpdateTest);
        assert_eq!(
            blueprint.delivery.resolved_endpoint(),
            "https://crm.atomwalk.com/lab_api/process_glp_test_data/PMA_00001/"
        );

        let toml = ConfigLoader::to_toml(&blueprint).unwrap();
        let again = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(again.directories.backup, blueprint.directories.backup);
        assert_eq!(again.mapping.test_names, blueprint.mapping.test_names);

        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let again = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(again.delivery.token_env.as_deref(), Some("ASTM_BRIDGE_TOKEN"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use astm_bridge_cli::Pipeline;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{FileOutcome, InterfaceBlueprint, ListenerRole, RunOutcome};
    use dispatcher::HttpSink;
    use ingestion::FrameListener;
    use observability::MemoryAuditLog;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn frame(device: &str, subject: &str, results: &[(&str, &str)]) -> String {
        let mut text = format!("\x021H|\\^&|||{device}|||||||P|1\r");
        text.push_str(&format!("P|1||{subject}\r"));
        for (i, (code, value)) in results.iter().enumerate() {
            text.push_str(&format!("R|{}|^^^{code}|{value}|10*3/uL\r", i + 1));
        }
        text.push_str("L|1|N\r\x03\x04");
        text
    }

    fn blueprint(root: &TempDir, server: &MockServer) -> InterfaceBlueprint {
        let toml = format!(
            r#"
[directories]
input = "{root}/astm"
processed = "{root}/astm_processed"
backup = "{root}/astm_backup"
backup_processed = "{root}/astm_backup_processed"

[delivery]
endpoint = "{uri}/lab_api/process_glp_test_data/PMA_00001/"
token = "tok-e2e"
timeout_secs = 5
"#,
            root = root.path().display(),
            uri = server.uri(),
        );
        let mut blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        // ephemeral port for the test listener
        blueprint.listener.tcp_port = 0;
        blueprint
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".astm"))
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// End-to-end: TCP listener + backup listener → one pass → HTTP backend
    ///
    /// 验证完整的数据流：
    /// 1. 主监听器通过 TCP 接收两帧并写入主目录
    /// 2. 备份监听器写入一帧
    /// 3. 处理轮次先将备份帧转移到主目录，再把每条结果记录 POST 到后端
    /// 4. 全部成功的文件被归档，状态日志记录完整过程
    #[tokio::test]
    async fn test_e2e_frames_reach_backend() {
        let root = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/lab_api/process_glp_test_data/PMA_00001/"))
            .and(header("authorization", "Bearer tok-e2e"))
            .respond_with(ResponseTemplate::new(200).set_body_string("saved"))
            .expect(4)
            .mount(&server)
            .await;

        let blueprint = blueprint(&root, &server);
        let audit = MemoryAuditLog::new();

        // 1. primary listener over TCP, two frames split across writes
        let primary =
            FrameListener::from_blueprint(&blueprint, ListenerRole::Primary, Arc::new(audit.clone()));
        let tcp = primary.bind_tcp().await.unwrap();
        let addr = tcp.local_addr().unwrap();

        let first = frame("ADVIA2120", "R-1", &[("RBC", "4.52"), ("WBC", "6.1")]);
        let second = frame("ADVIA2120", "R-2", &[("HGB", "13.9")]);
        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let (head, tail) = first.split_at(10);
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(tail.as_bytes()).await.unwrap();
            stream.write_all(second.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let stats = primary.serve_tcp(tcp).await.unwrap();
        client.await.unwrap();
        assert_eq!(stats.frames_stored, 2);
        assert_eq!(names(&blueprint.directories.input).len(), 2);

        // 2. backup listener fed from an in-memory reader
        let backup =
            FrameListener::from_blueprint(&blueprint, ListenerRole::Backup, Arc::new(audit.clone()));
        let third = frame("ADVIA2120", "R-3", &[("WBC", "7.4")]);
        backup.pump(third.as_bytes(), "memory").await.unwrap();
        assert_eq!(names(&blueprint.directories.backup).len(), 1);

        // 3. one pass against the mock backend
        let sink = HttpSink::from_config(&blueprint.delivery).unwrap();
        let pipeline = Pipeline::new(&blueprint, sink, audit.clone());
        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.relay.copied, 1);
        assert_eq!(report.files.len(), 3);
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(report.records_delivered(), 4);
        assert!(names(&blueprint.directories.input).is_empty());
        assert!(names(&blueprint.directories.backup).is_empty());
        assert_eq!(names(&blueprint.directories.processed).len(), 3);
        assert_eq!(names(&blueprint.directories.backup_processed).len(), 1);
        assert_eq!(pipeline.sink().metrics().delivered, 4);

        let labels = audit.labels();
        assert_eq!(labels.iter().filter(|l| *l == "Frame Stored").count(), 3);
        assert_eq!(labels.iter().filter(|l| *l == "ERP Status: 200").count(), 4);
        assert_eq!(labels.iter().filter(|l| *l == "Processed").count(), 3);
        assert_eq!(labels.last().map(String::as_str), Some("All Success"));
        // relay happens inside the pass, before the scan
        let relayed = labels.iter().position(|l| l == "Relayed").unwrap();
        let found = labels.iter().position(|l| l == "Files Found").unwrap();
        assert!(relayed < found);
    }

    /// A rejected record keeps its file in the queue; siblings still go through
    #[tokio::test]
    async fn test_e2e_rejected_record_retried_next_pass() {
        let root = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "test_data": { "test_value": "ERR" } })))
            .respond_with(ResponseTemplate::new(500).set_body_string("rejected"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "test_data": { "test_name": "White Cell Count", "rat_no": "R-7" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("saved"))
            .mount(&server)
            .await;

        let blueprint = blueprint(&root, &server);
        let audit = MemoryAuditLog::new();
        let listener = FrameListener::from_blueprint(
            &blueprint,
            ListenerRole::Primary,
            Arc::new(audit.clone()),
        );
        let transmission = frame("ADVIA2120", "R-7", &[("WBC", "5.0"), ("WBC", "ERR")]);
        listener
            .pump(transmission.as_bytes(), "memory")
            .await
            .unwrap();

        let sink = HttpSink::from_config(&blueprint.delivery).unwrap();
        let pipeline = Pipeline::new(&blueprint, sink, audit.clone());
        let report = pipeline.run_pass().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Failure);
        assert_eq!(report.files[0].outcome, FileOutcome::Partial);
        assert_eq!(names(&blueprint.directories.input).len(), 1);
        assert!(names(&blueprint.directories.processed).is_empty());

        let delivery = pipeline.sink().metrics();
        assert_eq!(delivery.delivered, 1);
        assert_eq!(delivery.rejected, 1);

        let labels = audit.labels();
        assert!(labels.contains(&"ERP Status: 500".to_string()));
        assert!(labels.contains(&"Partial Failure".to_string()));
        assert_eq!(labels.last().map(String::as_str), Some("Batch Issues"));
        // the lock is released for the next pass
        assert!(!blueprint.directories.input.join(ingestion::LOCK_FILE_NAME).exists());
    }
}
