use super::*;

/// Live shell of a connected session.
struct Connection {
    client: Client,
    sender: Sender<String>,
    recv: Receiver<String>,
    prompt: String,
}

/// SSH shell session against the controller CLI.
pub struct SshSession {
    config: ControllerConfig,
    security_options: ConnectionSecurityOptions,
    handler: DeviceHandler,
    connection: Option<Connection>,
    /// Optional session recorder bound to this session.
    recorder: Option<SessionRecorder>,
}

/// Builds [`SshSession`]s for one controller.
#[derive(Clone)]
pub struct SshSessionFactory {
    config: ControllerConfig,
    handler: DeviceHandler,
    recorder: Option<SessionRecorder>,
}

impl SshSessionFactory {
    pub fn new(config: ControllerConfig) -> Result<Self, WlcError> {
        config.validate()?;
        let mut handler = templates::aireos()?;
        handler.dyn_param = HashMap::from([
            (
                templates::USERNAME_PARAM.to_string(),
                format!("{}\n", config.username),
            ),
            (
                templates::PASSWORD_PARAM.to_string(),
                format!("{}\n", config.password),
            ),
        ]);
        Ok(Self {
            config,
            handler,
            recorder: None,
        })
    }

    /// Records every session this factory creates into `recorder`.
    pub fn with_recorder(mut self, recorder: SessionRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }
}

impl SessionFactory for SshSessionFactory {
    type Session = SshSession;

    fn create(&self) -> SshSession {
        SshSession {
            security_options: ConnectionSecurityOptions::for_level(self.config.security),
            config: self.config.clone(),
            handler: self.handler.clone(),
            connection: None,
            recorder: self.recorder.clone(),
        }
    }
}

impl SshSession {
    async fn open(&mut self) -> Result<Connection, WlcError> {
        let device_addr = self.config.device_addr();

        let ssh_config = Config {
            preferred: self.security_options.preferred(),
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let client = Client::connect_with_config(
            (self.config.host.clone(), self.config.port),
            &self.config.username,
            AuthMethod::with_password(&self.config.password),
            self.security_options.server_check.clone(),
            ssh_config,
        )
        .await?;
        debug!("{} TCP connection successful", device_addr);

        let mut channel = client.get_channel().await?;
        channel
            .request_pty(false, "xterm", 800, 600, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        debug!("{} Shell request successful", device_addr);

        let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(256);
        let (sender_to_user, mut receiver_from_shell) = mpsc::channel::<String>(256);

        let io_task_device_addr = device_addr.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(data) = receiver_from_user.recv() => {
                        if let Err(e) = channel.data(data.as_bytes()).await {
                            debug!("{} Failed to send data to shell: {:?}", io_task_device_addr, e);
                            break;
                        }
                    },
                    Some(msg) = channel.wait() => {
                        match msg {
                            ChannelMsg::Data { ref data } => {
                                if let Ok(s) = std::str::from_utf8(data)
                                    && sender_to_user.send(s.to_string()).await.is_err() {
                                        debug!("{} Shell output receiver dropped. Closing task.", io_task_device_addr);
                                        break;
                                    }
                            }
                            ChannelMsg::ExitStatus { exit_status } => {
                                debug!("{} Shell exited with status code: {}", io_task_device_addr, exit_status);
                                let _ = channel.eof().await;
                                break;
                            }
                            ChannelMsg::Eof => {
                                debug!("{} Shell sent EOF.", io_task_device_addr);
                                break;
                            }
                            _ => {}
                        }
                    }
                    else => break,
                }
            }
            debug!("{} SSH I/O task ended.", io_task_device_addr);
        });

        let handler = &mut self.handler;
        handler.reset();
        let mut buffer = String::new();
        let mut initial_output = String::new();

        // The controller repeats the login inside the shell before the first
        // prompt; User:/Password: are answered from the handler's params.
        let init_result = tokio::time::timeout(self.config.command_timeout(), async {
            loop {
                let Some(data) = receiver_from_shell.recv().await else {
                    return Err(WlcError::ChannelDisconnectError);
                };
                trace!("{:?}", data);
                buffer.push_str(&data);
                initial_output.push_str(&data);

                while let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer.drain(..=newline_pos).collect::<String>();
                    handler.read(line.trim_end());
                }

                if buffer.is_empty() {
                    continue;
                }
                if handler.read_prompt(&buffer) {
                    handler.read(&buffer);
                    return Ok(std::mem::take(&mut buffer));
                }
                if let Some((input, _)) = handler.read_need_write(&buffer) {
                    handler.read(&buffer);
                    buffer.clear();
                    if let Err(e) = sender_to_shell.send(input).await {
                        return Err(WlcError::from(e));
                    }
                }
            }
        })
        .await;

        let prompt = match init_result {
            Ok(Ok(prompt)) => prompt,
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(WlcError::InitTimeout(if initial_output.is_empty() {
                    "waiting for initial prompt".to_string()
                } else {
                    initial_output
                }));
            }
        };

        if let Some(recorder) = self.recorder.as_ref() {
            let _ = recorder.record_event(SessionEvent::ConnectionEstablished {
                device_addr,
                prompt: prompt.clone(),
            });
        }

        Ok(Connection {
            client,
            sender: sender_to_shell,
            recv: receiver_from_shell,
            prompt,
        })
    }

    /// Prompt seen after the last command, if connected.
    pub fn prompt(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.prompt.as_str())
    }

    /// Executes a command and waits for the full output by matching the prompt.
    pub async fn write_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Output, WlcError> {
        let conn = self.connection.as_mut().ok_or(WlcError::NotConnected)?;
        let handler = &mut self.handler;
        let recorder = self.recorder.as_ref();

        // 1. Clear any residual data in the receiver
        while conn.recv.try_recv().is_ok() {}
        handler.reset();

        // 2. Send command to remote shell
        conn.sender.send(format!("{command}\n")).await?;

        // 3. Receive until a prompt (or a yes/no question) shows up
        let mut clean_output = String::new();
        let mut line_buffer = String::new();

        let result = tokio::time::timeout(timeout, async {
            loop {
                let Some(data) = conn.recv.recv().await else {
                    return Err(WlcError::ChannelDisconnectError);
                };
                if let Some(recorder) = recorder {
                    let _ = recorder.record_raw_chunk(data.clone());
                }
                line_buffer.push_str(&data);

                while let Some(newline_pos) = line_buffer.find('\n') {
                    let line = line_buffer.drain(..=newline_pos).collect::<String>();
                    let trim_start = IGNORE_START_LINE.replace(&line, "");
                    handler.read(trim_start.trim_end());
                    clean_output.push_str(&trim_start);
                }

                // The prompt arrives without a trailing newline.
                if line_buffer.is_empty() {
                    continue;
                }
                if handler.read_prompt(&line_buffer) {
                    let success = !handler.error();
                    handler.read(&line_buffer);
                    clean_output.push_str(&line_buffer);
                    conn.prompt = std::mem::take(&mut line_buffer);
                    return Ok(success);
                }
                if let Some((input, record)) = handler.read_need_write(&line_buffer) {
                    handler.read(&line_buffer);
                    if record {
                        clean_output.push_str(&line_buffer);
                    }
                    line_buffer.clear();
                    trace!("Input required: '{:?}'", input);
                    if let Err(e) = conn.sender.send(input).await {
                        return Err(WlcError::from(e));
                    }
                }
            }
        })
        .await;

        let success = match result {
            Ok(Ok(success)) => success,
            Ok(Err(err)) => {
                self.record_output(command, false, &clean_output, &clean_output);
                return Err(err);
            }
            Err(_) => {
                self.record_output(command, false, &clean_output, &clean_output);
                return Err(WlcError::ExecTimeout(clean_output));
            }
        };

        let all = clean_output;
        let mut content = all.as_str();

        // Remove the echoed command from the beginning of the output
        if !command.is_empty()
            && let Some(rest) = content.strip_prefix(command)
        {
            content = rest.trim_start_matches(['\n', '\r']);
        }

        // Remove the trailing prompt
        let content = match content.rfind('\n') {
            Some(pos) => content[..pos].trim_end_matches('\r'),
            None => "",
        };

        let output = Output {
            success,
            content: content.to_string(),
            prompt: self.handler.current_prompt().map(|v| v.to_string()),
            all,
        };
        self.record_output(command, output.success, &output.content, &output.all);
        Ok(output)
    }

    fn record_output(&self, command: &str, success: bool, content: &str, all: &str) {
        if let Some(recorder) = self.recorder.as_ref() {
            let _ = recorder.record_event(SessionEvent::CommandOutput {
                command: command.to_string(),
                success,
                content: content.to_string(),
                all: all.to_string(),
            });
        }
    }

    async fn run(&mut self, command: &str) -> Result<String, WlcError> {
        let output = self
            .write_with_timeout(command, self.config.command_timeout())
            .await?;
        if !output.success {
            return Err(WlcError::CommandRejected {
                command: command.to_string(),
                output: output.content,
            });
        }
        Ok(output.content)
    }
}

impl DeviceSession for SshSession {
    async fn connect(&mut self, max_retries: u32) -> Result<(), WlcError> {
        if self.is_connected() {
            return Ok(());
        }
        let device_addr = self.config.device_addr();
        let attempts = max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.open().await {
                Ok(connection) => {
                    self.connection = Some(connection);
                    debug!("{} connected on attempt {}/{}", device_addr, attempt, attempts);
                    if let Err(e) = self.run(templates::PAGING_DISABLE).await {
                        debug!("{} could not disable paging: {}", device_addr, e);
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "{} connect attempt {}/{} failed: {}",
                        device_addr, attempt, attempts, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(WlcError::ConnectFailure(format!(
            "{} after {} attempts: {}",
            device_addr,
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn send_command(&mut self, command: &str) -> Result<String, WlcError> {
        self.run(command).await
    }

    async fn send_config_lines(&mut self, lines: &[String]) -> Result<String, WlcError> {
        let mut combined = Vec::with_capacity(lines.len());
        for line in lines {
            combined.push(self.run(line).await?);
        }
        Ok(combined.join("\n"))
    }

    async fn disconnect(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        let device_addr = self.config.device_addr();
        debug!("Closing SSH session {}", device_addr);

        if let Some(recorder) = self.recorder.as_ref() {
            let _ = recorder.record_event(SessionEvent::ConnectionClosed {
                reason: "disconnect".to_string(),
            });
        }

        if !connection.client.is_closed() {
            if let Err(e) = connection
                .sender
                .send(format!("{}\n", templates::LOGOUT))
                .await
            {
                debug!("Failed to send logout: {:?}", e);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        connection.recv.close();

        if let Err(e) = connection.client.disconnect().await {
            debug!("{} disconnect error: {}", device_addr, e);
        }
        debug!("SSH session {} closed", device_addr);
    }

    fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| !c.client.is_closed())
            .unwrap_or(false)
    }
}
