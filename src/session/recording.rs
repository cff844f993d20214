use super::*;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Session recording granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum SessionRecordLevel {
    /// Disable recording.
    Off,
    /// Record key events only.
    KeyEventsOnly,
    /// Record key events and raw chunks.
    #[default]
    Full,
}

/// A single recorded session event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionRecordEntry {
    pub ts_ms: u128,
    pub event: SessionEvent,
}

/// Supported recorded event types.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    ConnectionEstablished {
        device_addr: String,
        prompt: String,
    },
    ConnectionClosed {
        reason: String,
    },
    CommandOutput {
        command: String,
        success: bool,
        content: String,
        #[serde(default)]
        all: String,
    },
    RawChunk {
        data: String,
    },
}

/// In-memory session recorder. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    level: SessionRecordLevel,
    entries: Arc<Mutex<Vec<SessionRecordEntry>>>,
}

impl SessionRecorder {
    pub fn new(level: SessionRecordLevel) -> Self {
        Self {
            level,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn level(&self) -> SessionRecordLevel {
        self.level
    }

    /// Record a key-level event.
    pub fn record_event(&self, event: SessionEvent) -> Result<(), WlcError> {
        if self.level == SessionRecordLevel::Off {
            return Ok(());
        }
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| WlcError::Internal(format!("record lock error: {e}")))?;
        guard.push(SessionRecordEntry {
            ts_ms: now_ms(),
            event,
        });
        Ok(())
    }

    /// Record raw shell data chunk when enabled.
    pub fn record_raw_chunk(&self, data: String) -> Result<(), WlcError> {
        if self.level != SessionRecordLevel::Full {
            return Ok(());
        }
        self.record_event(SessionEvent::RawChunk { data })
    }

    /// Snapshot all records.
    pub fn entries(&self) -> Result<Vec<SessionRecordEntry>, WlcError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| WlcError::Internal(format!("record lock error: {e}")))?;
        Ok(guard.clone())
    }

    /// Export records as JSONL.
    pub fn to_jsonl(&self) -> Result<String, WlcError> {
        let entries = self.entries()?;
        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            let line = serde_json::to_string(&entry)
                .map_err(|e| WlcError::Internal(format!("record encode error: {e}")))?;
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    /// Restore recorder from JSONL lines. Blank lines are skipped.
    pub fn from_jsonl(jsonl: &str) -> Result<Self, WlcError> {
        let mut parsed = Vec::new();
        for line in jsonl.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: SessionRecordEntry = serde_json::from_str(line)
                .map_err(|e| WlcError::Internal(format!("record decode error: {e}")))?;
            parsed.push(entry);
        }

        Ok(Self {
            level: SessionRecordLevel::Full,
            entries: Arc::new(Mutex::new(parsed)),
        })
    }
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(SessionRecordLevel::Full)
    }
}

/// Recorded outputs per command, in recording order.
type ReplayScript = HashMap<String, Vec<(bool, String)>>;

/// What replay sessions were asked to send.
#[derive(Debug, Default)]
struct Transcript {
    /// Every line in send order.
    commands: Vec<String>,
    /// Each `send_config_lines` call as one set.
    config_sets: Vec<Vec<String>>,
}

type SharedTranscript = Arc<Mutex<Transcript>>;

/// Offline session answering from a recording.
pub struct ReplaySession {
    script: Arc<ReplayScript>,
    cursors: HashMap<String, usize>,
    connected: bool,
    transcript: SharedTranscript,
}

impl ReplaySession {
    pub fn from_recorder(recorder: &SessionRecorder) -> Result<Self, WlcError> {
        Ok(Self::with_script(
            Arc::new(build_script(&recorder.entries()?)),
            SharedTranscript::default(),
        ))
    }

    pub fn from_jsonl(jsonl: &str) -> Result<Self, WlcError> {
        Self::from_recorder(&SessionRecorder::from_jsonl(jsonl)?)
    }

    fn with_script(script: Arc<ReplayScript>, transcript: SharedTranscript) -> Self {
        Self {
            script,
            cursors: HashMap::new(),
            connected: false,
            transcript,
        }
    }

    /// Every command sent so far, including `logout` on disconnect.
    pub fn sent_commands(&self) -> Vec<String> {
        read_transcript(&self.transcript, |t| t.commands.clone())
    }

    fn write_transcript(&self, write: impl FnOnce(&mut Transcript)) -> Result<(), WlcError> {
        let mut guard = self
            .transcript
            .lock()
            .map_err(|e| WlcError::Internal(format!("transcript lock error: {e}")))?;
        write(&mut guard);
        Ok(())
    }

    fn push_transcript(&self, command: &str) -> Result<(), WlcError> {
        self.write_transcript(|t| t.commands.push(command.to_string()))
    }

    fn replay(&mut self, command: &str) -> Result<String, WlcError> {
        if !self.connected {
            return Err(WlcError::NotConnected);
        }
        self.push_transcript(command)?;
        trace!("replay: {command}");

        let outputs = self.script.get(command).ok_or_else(|| {
            WlcError::ReplayMismatch(format!("no replayable output found for command '{command}'"))
        })?;
        let cursor = self.cursors.entry(command.to_string()).or_insert(0);
        let index = (*cursor).min(outputs.len().saturating_sub(1));
        *cursor += 1;

        let (success, content) = outputs.get(index).cloned().ok_or_else(|| {
            WlcError::ReplayMismatch(format!("no replayable output found for command '{command}'"))
        })?;
        if !success {
            return Err(WlcError::CommandRejected {
                command: command.to_string(),
                output: content,
            });
        }
        Ok(content)
    }
}

impl DeviceSession for ReplaySession {
    async fn connect(&mut self, _max_retries: u32) -> Result<(), WlcError> {
        self.connected = true;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<String, WlcError> {
        self.replay(command)
    }

    async fn send_config_lines(&mut self, lines: &[String]) -> Result<String, WlcError> {
        if !self.connected {
            return Err(WlcError::NotConnected);
        }
        self.write_transcript(|t| t.config_sets.push(lines.to_vec()))?;
        let mut combined = Vec::with_capacity(lines.len());
        for line in lines {
            combined.push(self.replay(line)?);
        }
        Ok(combined.join("\n"))
    }

    async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.push_transcript(templates::LOGOUT) {
            debug!("replay disconnect: {e}");
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Hands out replay sessions over one shared recording. Each session keeps
/// its own per-command cursors; all of them write to one transcript.
#[derive(Clone)]
pub struct ReplayFactory {
    script: Arc<ReplayScript>,
    transcript: SharedTranscript,
}

impl ReplayFactory {
    pub fn from_recorder(recorder: &SessionRecorder) -> Result<Self, WlcError> {
        Ok(Self {
            script: Arc::new(build_script(&recorder.entries()?)),
            transcript: SharedTranscript::default(),
        })
    }

    pub fn from_jsonl(jsonl: &str) -> Result<Self, WlcError> {
        Self::from_recorder(&SessionRecorder::from_jsonl(jsonl)?)
    }

    /// Commands sent by every session this factory created, in send order.
    pub fn sent_commands(&self) -> Vec<String> {
        read_transcript(&self.transcript, |t| t.commands.clone())
    }

    /// Line sets passed to `send_config_lines`, one entry per call.
    pub fn sent_config_sets(&self) -> Vec<Vec<String>> {
        read_transcript(&self.transcript, |t| t.config_sets.clone())
    }
}

impl SessionFactory for ReplayFactory {
    type Session = ReplaySession;

    fn create(&self) -> ReplaySession {
        ReplaySession::with_script(self.script.clone(), self.transcript.clone())
    }
}

fn build_script(entries: &[SessionRecordEntry]) -> ReplayScript {
    let mut script = ReplayScript::new();
    for entry in entries {
        if let SessionEvent::CommandOutput {
            command,
            success,
            content,
            ..
        } = &entry.event
        {
            script
                .entry(command.clone())
                .or_default()
                .push((*success, content.clone()));
        }
    }
    script
}

fn read_transcript<T: Default>(transcript: &Mutex<Transcript>, read: impl FnOnce(&Transcript) -> T) -> T {
    transcript
        .lock()
        .map(|guard| read(&guard))
        .unwrap_or_default()
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{"ts_ms":1,"event":{"kind":"connection_established","device_addr":"admin@10.0.0.5:22","prompt":"(wlc) >"}}
{"ts_ms":2,"event":{"kind":"raw_chunk","data":"chunk"}}
{"ts_ms":3,"event":{"kind":"command_output","command":"show sysinfo","success":true,"content":"first","all":"show sysinfo\nfirst\n(wlc) >"}}
{"ts_ms":4,"event":{"kind":"command_output","command":"show sysinfo","success":true,"content":"second","all":""}}
{"ts_ms":5,"event":{"kind":"command_output","command":"config ap reset nope","success":false,"content":"Unknown AP name nope"}}
"#;

    #[test]
    fn recorder_jsonl_roundtrip() {
        let recorder = SessionRecorder::new(SessionRecordLevel::Full);
        recorder
            .record_event(SessionEvent::ConnectionClosed {
                reason: "disconnect".to_string(),
            })
            .expect("record close");

        let jsonl = recorder.to_jsonl().expect("encode jsonl");
        let restored = SessionRecorder::from_jsonl(&jsonl).expect("decode jsonl");
        let entries = restored.entries().expect("entries");

        assert_eq!(entries.len(), 1);
        assert!(matches!(
            entries[0].event,
            SessionEvent::ConnectionClosed { .. }
        ));
    }

    #[test]
    fn key_events_only_skips_raw_chunks() {
        let recorder = SessionRecorder::new(SessionRecordLevel::KeyEventsOnly);
        recorder
            .record_raw_chunk("noise".to_string())
            .expect("raw chunk");
        recorder
            .record_event(SessionEvent::ConnectionClosed {
                reason: "done".to_string(),
            })
            .expect("event");

        assert_eq!(recorder.entries().expect("entries").len(), 1);
    }

    #[test]
    fn off_level_records_nothing() {
        let recorder = SessionRecorder::new(SessionRecordLevel::Off);
        recorder
            .record_raw_chunk("noise".to_string())
            .expect("raw chunk");
        assert!(recorder.entries().expect("entries").is_empty());
    }

    #[test]
    fn from_jsonl_accepts_empty_input() {
        let recorder = SessionRecorder::from_jsonl("\n  \n").expect("empty jsonl");
        assert!(recorder.entries().expect("entries").is_empty());
    }

    #[test]
    fn from_jsonl_rejects_garbage() {
        assert!(matches!(
            SessionRecorder::from_jsonl("{not json"),
            Err(WlcError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn replay_consumes_outputs_in_order_and_repeats_last() {
        let mut session = ReplaySession::from_jsonl(FIXTURE).expect("fixture");
        session.connect(1).await.expect("connect");

        assert_eq!(session.send_command("show sysinfo").await.expect("1"), "first");
        assert_eq!(session.send_command("show sysinfo").await.expect("2"), "second");
        assert_eq!(session.send_command("show sysinfo").await.expect("3"), "second");
    }

    #[tokio::test]
    async fn replay_reports_missing_and_rejected_commands() {
        let mut session = ReplaySession::from_jsonl(FIXTURE).expect("fixture");
        session.connect(1).await.expect("connect");

        match session.send_command("show nothing").await {
            Err(WlcError::ReplayMismatch(msg)) => assert!(msg.contains("show nothing")),
            other => panic!("unexpected result: {other:?}"),
        }
        match session.send_command("config ap reset nope").await {
            Err(WlcError::CommandRejected { command, output }) => {
                assert_eq!(command, "config ap reset nope");
                assert!(output.contains("Unknown AP"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn replay_requires_connection() {
        let mut session = ReplaySession::from_jsonl(FIXTURE).expect("fixture");
        assert!(matches!(
            session.send_command("show sysinfo").await,
            Err(WlcError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn factory_sessions_have_own_cursors_and_share_transcript() {
        let factory = ReplayFactory::from_jsonl(FIXTURE).expect("fixture");
        let mut a = factory.create();
        let mut b = factory.create();
        a.connect(1).await.expect("connect a");
        b.connect(1).await.expect("connect b");

        assert_eq!(a.send_command("show sysinfo").await.expect("a"), "first");
        assert_eq!(b.send_command("show sysinfo").await.expect("b"), "first");
        a.disconnect().await;
        assert!(!a.is_connected());

        assert_eq!(
            factory.sent_commands(),
            vec!["show sysinfo", "show sysinfo", "logout"]
        );
    }

    #[tokio::test]
    async fn config_lines_are_logged_as_one_set() {
        let factory = ReplayFactory::from_jsonl(FIXTURE).expect("fixture");
        let mut session = factory.create();
        session.connect(1).await.expect("connect");

        let lines = vec!["show sysinfo".to_string(), "show sysinfo".to_string()];
        let output = session.send_config_lines(&lines).await.expect("lines");

        assert_eq!(output, "first\nsecond");
        assert_eq!(factory.sent_config_sets(), vec![lines.clone()]);
        assert_eq!(factory.sent_commands(), lines);
    }
}
