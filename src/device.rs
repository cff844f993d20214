//! Prompt state machine for controller CLI sessions.
//!
//! Every line the shell prints is classified against one combined regex set.
//! The resulting state tells the session whether a command's output is
//! complete (a prompt), whether the shell expects input (pagination, login,
//! credentials) and whether the controller rejected the command.

use std::collections::HashMap;

use log::trace;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use crate::error::WlcError;

/// What to type when an input state is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// Look `value` up in [`DeviceHandler::dyn_param`] instead of sending it.
    pub dynamic: bool,
    pub value: String,
    /// Keep the prompt line in the command output.
    pub record: bool,
}

impl Input {
    /// Sends `value` verbatim.
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            dynamic: false,
            value: value.into(),
            record: false,
        }
    }

    /// Sends the dynamic parameter stored under `key`.
    pub fn dynamic(key: impl Into<String>) -> Self {
        Self {
            dynamic: true,
            value: key.into(),
            record: false,
        }
    }
}

#[derive(Clone)]
pub struct DeviceHandler {
    /// Index of the current state in `all_states`
    current_state_index: usize,

    all_states: Vec<String>,

    /// Combined regex set for matching all state patterns
    all_regex: RegexSet,

    /// Maps regex match index to state index
    regex_index_map: HashMap<usize, usize>,

    /// Index range of states that terminate a command's output (start, end)
    prompt_index: (usize, usize),

    input_map: HashMap<String, Input>,

    /// Error lines that should not mark the command as rejected
    ignore_errors: Option<RegexSet>,

    /// Values for dynamic inputs (credentials)
    pub dyn_param: HashMap<String, String>,

    /// Last prompt text matched by the state machine.
    current_prompt: Option<String>,
}

/// Predefined states that exist in every handler.
const PRE_STATE: [&str; 3] = ["output", "more", "error"];

impl DeviceHandler {
    /// Creates a new `DeviceHandler`.
    ///
    /// # Arguments
    ///
    /// * `prompt` - (state, patterns) for lines that end a command's output
    /// * `write` - (state, input, patterns) for lines that expect input
    /// * `more_regex` - pagination markers, answered with a space
    /// * `error_regex` - lines that mean the command was rejected
    /// * `ignore_errors` - error lines to treat as plain output
    /// * `dyn_param` - values for dynamic inputs
    pub fn new<I, S>(
        prompt: Vec<(String, I)>,
        write: Vec<(String, Input, I)>,
        more_regex: I,
        error_regex: I,
        ignore_errors: I,
        dyn_param: HashMap<String, String>,
    ) -> Result<DeviceHandler, WlcError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let mut all_states: Vec<String> = PRE_STATE.iter().map(|s| s.to_string()).collect();
        let mut regexs: Vec<String> = Vec::new();
        let mut regex_index_map = HashMap::new();

        let mut push_patterns = |patterns: Vec<String>, state_index: usize| {
            let start_offset = regexs.len();
            regexs.extend(patterns);
            for i in start_offset..regexs.len() {
                regex_index_map.insert(i, state_index);
            }
        };

        push_patterns(
            more_regex.into_iter().map(|s| s.as_ref().to_string()).collect(),
            1,
        );
        push_patterns(
            error_regex.into_iter().map(|s| s.as_ref().to_string()).collect(),
            2,
        );

        let prompt_start = all_states.len();
        for (state, patterns) in prompt {
            let state_index = all_states.len();
            all_states.push(state.to_ascii_lowercase());
            // Prompts may arrive after stray NULs or a carriage return.
            let anchored = patterns
                .into_iter()
                .map(|s| format!(r"^\x00*\r?{}", s.as_ref().trim_start_matches('^')))
                .collect();
            push_patterns(anchored, state_index);
        }
        if all_states.len() == prompt_start {
            return Err(WlcError::InvalidDeviceHandlerConfig(
                "at least one prompt state is required".to_string(),
            ));
        }
        let prompt_index = (prompt_start, all_states.len() - 1);

        let mut input_map = HashMap::new();
        for (state, input, patterns) in write {
            let state_index = all_states.len();
            let normalized = state.to_ascii_lowercase();
            all_states.push(normalized.clone());
            input_map.insert(normalized, input);
            push_patterns(
                patterns.into_iter().map(|s| s.as_ref().to_string()).collect(),
                state_index,
            );
        }
        input_map.insert("more".to_string(), Input::fixed(" "));

        let all_regex = RegexSet::new(&regexs).map_err(|err| {
            WlcError::InvalidDeviceHandlerConfig(format!("failed to build state regex set: {err}"))
        })?;

        let mut ignore_iter = ignore_errors.into_iter().peekable();
        let ignore_errors = if ignore_iter.peek().is_none() {
            None
        } else {
            Some(RegexSet::new(ignore_iter).map_err(|err| {
                WlcError::InvalidDeviceHandlerConfig(format!(
                    "invalid ignore_errors regex set: {err}"
                ))
            })?)
        };

        Ok(Self {
            current_state_index: 0,
            all_states,
            all_regex,
            regex_index_map,
            prompt_index,
            input_map,
            ignore_errors,
            dyn_param,
            current_prompt: None,
        })
    }

    /// Classifies a line. Unmatched lines are plain output (index 0).
    fn line2state(&self, line: &str) -> usize {
        self.all_regex
            .matches(line)
            .iter()
            .next()
            .and_then(|index| self.regex_index_map.get(&index).copied())
            .unwrap_or(0)
    }

    fn state_name(&self, index: usize) -> &str {
        self.all_states
            .get(index)
            .map(|s| s.as_str())
            .unwrap_or("output")
    }

    /// Feeds one line of shell output into the state machine.
    pub fn read(&mut self, line: &str) {
        trace!("Read line: '{:?}'", line);
        let state_index = self.line2state(line);
        trace!("Converted to state: '{:?}'", self.state_name(state_index));
        if self.ignore_error(line) {
            trace!("Ignoring error state");
            self.current_state_index = 0;
            return;
        }
        let is_prompt = self.match_prompt(state_index);
        if is_prompt {
            self.current_prompt = Some(line.to_string());
        }
        // An error line stays sticky until the next prompt.
        if self.error() && !is_prompt {
            return;
        }
        self.current_state_index = state_index;
    }

    fn ignore_error(&self, line: &str) -> bool {
        self.ignore_errors
            .as_ref()
            .map(|set| set.is_match(line))
            .unwrap_or(false)
    }

    fn match_prompt(&self, index: usize) -> bool {
        let (start, end) = self.prompt_index;
        index >= start && index <= end
    }

    /// True when the (possibly newline-less) line is a prompt, meaning the
    /// command's output is complete.
    pub fn read_prompt(&self, line: &str) -> bool {
        trace!("Checking if line is a prompt: '{:?}'", line);
        self.match_prompt(self.line2state(line))
    }

    /// Returns the input to send when the line asks for one, with whether the
    /// line should stay in the recorded output.
    pub fn read_need_write(&self, line: &str) -> Option<(String, bool)> {
        trace!("Checking if input is required: '{:?}'", line);
        let state_index = self.line2state(line);
        let input = self.input_map.get(self.state_name(state_index))?;
        if input.dynamic {
            return self
                .dyn_param
                .get(&input.value)
                .map(|value| (value.clone(), input.record));
        }
        Some((input.value.clone(), input.record))
    }

    pub fn current_state(&self) -> &str {
        self.state_name(self.current_state_index)
    }

    /// Last prompt text matched by the state machine.
    pub fn current_prompt(&self) -> Option<&str> {
        self.current_prompt.as_deref()
    }

    /// True if an error line was read since the last prompt.
    pub fn error(&self) -> bool {
        self.current_state_index == 2
    }

    /// Forgets the error flag before a new command is sent.
    pub fn reset(&mut self) {
        self.current_state_index = 0;
    }

    /// All declared state names.
    pub fn states(&self) -> Vec<String> {
        self.all_states.clone()
    }
}

/// Carriage returns and backspaces some controllers print at line start.
pub static IGNORE_START_LINE: Lazy<Regex> =
    Lazy::new(
        || match Regex::new(r"^(\r+(\s+\r+)*)|(\u{8}+(\s+\u{8}+)*)") {
            Ok(re) => re,
            Err(err) => panic!("invalid IGNORE_START_LINE regex: {err}"),
        },
    );

#[cfg(test)]
mod tests {
    use super::{DeviceHandler, Input};
    use crate::error::WlcError;
    use std::collections::HashMap;

    fn build_test_handler() -> DeviceHandler {
        let mut dyn_param = HashMap::new();
        dyn_param.insert("Password".to_string(), "secret\n".to_string());

        DeviceHandler::new(
            vec![
                ("Exec".to_string(), vec![r"^\(wlc\) >\s*$"]),
                ("Confirm".to_string(), vec![r".*\(y/n\)\s*$"]),
            ],
            vec![(
                "Password".to_string(),
                Input::dynamic("Password"),
                vec![r"^Password:\s*$"],
            )],
            vec![r"^--More--"],
            vec![r"^Incorrect usage"],
            vec![r"^Incorrect usage: benign"],
            dyn_param,
        )
        .expect("test handler config should be valid")
    }

    #[test]
    fn error_state_survives_output_until_prompt() {
        let mut handler = build_test_handler();

        assert!(!handler.error());
        handler.read("Incorrect usage. Use the '?' or <TAB> key");
        handler.read("to list commands.");
        assert!(handler.error());
        handler.read("(wlc) >");
        assert!(!handler.error());
    }

    #[test]
    fn ignore_error_pattern_resets_to_output_state() {
        let mut handler = build_test_handler();

        handler.read("Incorrect usage: benign");
        assert_eq!(handler.current_state(), "output");
        assert!(!handler.error());
    }

    #[test]
    fn prompt_and_confirmation_both_end_output() {
        let mut handler = build_test_handler();

        assert!(handler.read_prompt("(wlc) >"));
        assert!(handler.read_prompt("Are you sure you want to save? (y/n)"));
        assert!(!handler.read_prompt("AP Name.......... ap1"));

        handler.read("(wlc) >");
        assert_eq!(handler.current_prompt(), Some("(wlc) >"));
    }

    #[test]
    fn read_need_write_supports_dynamic_and_pagination_inputs() {
        let handler = build_test_handler();

        assert_eq!(
            handler.read_need_write("Password:"),
            Some(("secret\n".to_string(), false))
        );
        assert_eq!(
            handler.read_need_write("--More-- or (q)uit"),
            Some((" ".to_string(), false))
        );
        assert_eq!(handler.read_need_write("no input"), None);
    }

    #[test]
    fn missing_dynamic_value_yields_no_input() {
        let mut handler = build_test_handler();
        handler.dyn_param.clear();
        assert_eq!(handler.read_need_write("Password:"), None);
    }

    #[test]
    fn invalid_handler_regex_returns_config_error() {
        let err = match DeviceHandler::new(
            vec![("Exec".to_string(), vec![r"["])],
            vec![],
            vec![r"^--More--$"],
            vec![r"^ERROR: .+$"],
            vec![],
            HashMap::new(),
        ) {
            Ok(_) => panic!("invalid regex should fail handler construction"),
            Err(err) => err,
        };

        match err {
            WlcError::InvalidDeviceHandlerConfig(msg) => {
                assert!(msg.contains("failed to build state regex set"));
            }
            other => panic!("unexpected error type: {other}"),
        }
    }

    #[test]
    fn handler_without_prompt_is_rejected() {
        let result = DeviceHandler::new(
            Vec::<(String, Vec<&str>)>::new(),
            vec![],
            vec![],
            vec![],
            vec![],
            HashMap::new(),
        );
        assert!(matches!(
            result,
            Err(WlcError::InvalidDeviceHandlerConfig(_))
        ));
    }
}
