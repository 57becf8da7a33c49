//! FrameListener - instrument-facing receiver
//!
//! One listener serves one transport and writes every EOT-terminated frame
//! into its role's directory. Nothing is ever written back to the instrument.

use std::sync::Arc;

use contracts::{
    AuditLog, DeviceId, InterfaceBlueprint, ListenerConfig, ListenerRole, StatusLabel,
    StatusRecord, TransportKind,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, error, info, instrument, warn};

use crate::accumulator::FrameAccumulator;
use crate::audit::record;
use crate::error::{IngestionError, Result};
use crate::stats::{ListenerMetrics, ListenerStats};
use crate::store::MessageStore;

/// Receives transmissions and persists them as frame files
pub struct FrameListener {
    config: ListenerConfig,
    role: ListenerRole,
    store: MessageStore,
    audit: Arc<dyn AuditLog>,
    metrics: Arc<ListenerMetrics>,
}

impl FrameListener {
    pub fn new(
        config: ListenerConfig,
        role: ListenerRole,
        store: MessageStore,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            config,
            role,
            store,
            audit,
            metrics: Arc::new(ListenerMetrics::new()),
        }
    }

    /// Listener writing into the directory its role selects
    pub fn from_blueprint(
        blueprint: &InterfaceBlueprint,
        role: ListenerRole,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        let dir = blueprint.directories.listener_target(role);
        let store = MessageStore::new(dir, blueprint.listener.file_prefix.clone());
        Self::new(blueprint.listener.clone(), role, store, audit)
    }

    pub fn metrics(&self) -> Arc<ListenerMetrics> {
        self.metrics.clone()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Serve the configured transport.
    ///
    /// TCP returns when the single accepted connection closes. Serial reads
    /// until a transport error.
    pub async fn run(&self) -> Result<ListenerStats> {
        match self.config.transport {
            TransportKind::Tcp => {
                let listener = self.bind_tcp().await?;
                self.serve_tcp(listener).await
            }
            TransportKind::Serial => self.run_serial().await,
        }
    }

    pub async fn bind_tcp(&self) -> Result<TcpListener> {
        let endpoint = self.config.endpoint();
        let listener = TcpListener::bind((self.config.tcp_host.as_str(), self.config.tcp_port))
            .await
            .map_err(|e| self.fail(&endpoint, e))?;
        info!(endpoint = %endpoint, role = ?self.role, "listening for instrument connection");
        Ok(listener)
    }

    /// Accept exactly one connection and read it to EOF
    #[instrument(name = "listener_tcp", skip(self, listener), fields(role = ?self.role))]
    pub async fn serve_tcp(&self, listener: TcpListener) -> Result<ListenerStats> {
        let endpoint = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| self.config.endpoint());
        let (stream, peer) = listener.accept().await.map_err(|e| self.fail(&endpoint, e))?;
        info!(peer = %peer, "instrument connected");
        self.pump(stream, &endpoint).await
    }

    #[instrument(name = "listener_serial", skip(self), fields(role = ?self.role))]
    async fn run_serial(&self) -> Result<ListenerStats> {
        let endpoint = self.config.endpoint();
        let port_name = self
            .config
            .serial_port
            .as_deref()
            .ok_or_else(|| IngestionError::transport(&endpoint, "serial_port is not configured"))?;

        let port = tokio_serial::new(port_name, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| self.fail(&endpoint, e))?;
        info!(port = %port_name, baud = self.config.baud_rate, "serial port open");

        self.pump(port, &endpoint).await
    }

    /// Read `reader` to EOF, storing each completed frame
    pub async fn pump<R>(&self, mut reader: R, endpoint: &str) -> Result<ListenerStats>
    where
        R: AsyncRead + Unpin,
    {
        let mut accumulator = FrameAccumulator::new();
        let mut buf = vec![0u8; self.config.read_chunk_size.max(1)];

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => return Err(self.fail(endpoint, e)),
            };
            self.metrics.record_read(n);

            for frame in accumulator.push(&buf[..n]) {
                if frame.dropped_bytes > 0 {
                    warn!(dropped = frame.dropped_bytes, "invalid UTF-8 dropped from frame");
                    self.metrics.record_discarded(frame.dropped_bytes);
                }
                let stored = match self.store.save(&frame.text) {
                    Ok(stored) => stored,
                    Err(e) => {
                        self.report(endpoint, &e);
                        return Err(e);
                    }
                };
                self.metrics.record_stored();
                info!(file = %stored.file_name, bytes = stored.content.len(), "frame stored");
                record(
                    self.audit.as_ref(),
                    StatusRecord::new(
                        DeviceId::unknown(),
                        StatusLabel::FrameStored,
                        stored.file_name,
                        format!("{} bytes via {endpoint}", stored.content.len()),
                    ),
                );
            }
        }

        let tail = accumulator.discard();
        if tail > 0 {
            warn!(bytes = tail, "connection closed mid-frame, partial data discarded");
            self.metrics.record_discarded(tail);
        }
        debug!("transport reached EOF");
        Ok(self.metrics.snapshot())
    }

    fn fail(&self, endpoint: &str, err: impl std::fmt::Display) -> IngestionError {
        self.report(endpoint, &err);
        IngestionError::transport(endpoint, err)
    }

    /// Log and audit a failure that stops the listener
    fn report(&self, endpoint: &str, err: &dyn std::fmt::Display) {
        error!(endpoint = %endpoint, error = %err, "listener failed");
        record(
            self.audit.as_ref(),
            StatusRecord::new(
                DeviceId::unknown(),
                StatusLabel::ListenerError,
                endpoint,
                err.to_string(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ContractError, ListenerConfig};
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    #[derive(Default)]
    struct Recorded(Mutex<Vec<StatusRecord>>);

    impl AuditLog for Recorded {
        fn append(&self, record: StatusRecord) -> std::result::Result<(), ContractError> {
            self.0.lock().unwrap().push(record);
            Ok(())
        }
    }

    fn listener(dir: &std::path::Path, audit: Arc<Recorded>) -> FrameListener {
        let config = ListenerConfig {
            tcp_port: 0,
            ..Default::default()
        };
        FrameListener::new(
            config,
            ListenerRole::Primary,
            MessageStore::new(dir, "advia"),
            audit,
        )
    }

    fn stored_files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_pump_stores_each_frame() {
        let dir = tempdir().unwrap();
        let audit = Arc::new(Recorded::default());
        let listener = listener(dir.path(), audit.clone());

        let input: &[u8] = b"H|\\^&|||ADVIA\rR|1|^^^WBC|6.2\r\x04H|\\^&|||ADVIA\r\x04tail";
        let stats = listener.pump(input, "test").await.unwrap();

        assert_eq!(stats.frames_stored, 2);
        assert_eq!(stats.bytes_read, input.len() as u64);
        assert_eq!(stats.bytes_discarded, 4);
        assert_eq!(stored_files(dir.path()).len(), 2);
        assert_eq!(audit.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tcp_single_connection() {
        let dir = tempdir().unwrap();
        let listener = listener(dir.path(), Arc::new(Recorded::default()));

        let tcp = listener.bind_tcp().await.unwrap();
        let addr = tcp.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            // frame split over two writes
            stream.write_all(b"P|1||R-17\rR|1|^^^").await.unwrap();
            stream.write_all(b"HGB|14.1\r\x04").await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let stats = listener.serve_tcp(tcp).await.unwrap();
        client.await.unwrap();

        assert_eq!(stats.frames_stored, 1);
        let files = stored_files(dir.path());
        let content = std::fs::read_to_string(dir.path().join(&files[0])).unwrap();
        assert_eq!(content, "P|1||R-17\rR|1|^^^HGB|14.1\r\x04");
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let dir = tempdir().unwrap();
        // a regular file where the frame directory should be
        let blocked = dir.path().join("astm");
        std::fs::write(&blocked, "").unwrap();
        let audit = Arc::new(Recorded::default());
        let listener = listener(&blocked, audit.clone());

        let input: &[u8] = b"H|\\^&|||ADVIA\r\x04";
        let err = listener.pump(input, "test").await.unwrap_err();

        assert!(matches!(err, IngestionError::FileSystem { .. }));
        let records = audit.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, StatusLabel::ListenerError);
        assert_eq!(records[0].subject, "test");
    }

    #[tokio::test]
    async fn test_bind_failure_is_transport_error() {
        let dir = tempdir().unwrap();
        let audit = Arc::new(Recorded::default());
        let config = ListenerConfig {
            tcp_host: "203.0.113.1".to_string(),
            tcp_port: 1,
            ..Default::default()
        };
        let listener = FrameListener::new(
            config,
            ListenerRole::Backup,
            MessageStore::new(dir.path(), "advia"),
            audit.clone(),
        );

        let err = listener.bind_tcp().await.unwrap_err();
        assert!(matches!(err, IngestionError::Transport { .. }));
        assert_eq!(audit.0.lock().unwrap()[0].status, StatusLabel::ListenerError);
    }
}
