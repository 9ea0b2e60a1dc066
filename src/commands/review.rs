//! Line-oriented operator prompt for interactive runs.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use chrono::SecondsFormat;

use regen::pipeline::adjudicate::render;
use regen::pipeline::{Adjudicator, Decision, EndDecision, Presentation, Review};
use regen::rules::ProgressCheckpoint;
use regen::theme::Theme;
use regen::{RegenError, Result};

const RULE_WIDTH_FALLBACK: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Keep,
    Bypass,
    Retry,
    ShowDate,
    ShowData,
    ShowSnapshot,
    ShowDeclaration,
    Skip,
    SkipContent,
    SkipSelector,
    SkipMissingSelector,
    UpdateHistory,
}

const MENU: &[(&str, &[Choice])] = &[
    ("Decide", &[Choice::Keep, Choice::Bypass, Choice::Retry]),
    (
        "Analyze",
        &[
            Choice::ShowDate,
            Choice::ShowData,
            Choice::ShowSnapshot,
            Choice::ShowDeclaration,
        ],
    ),
    (
        "Skip",
        &[
            Choice::Skip,
            Choice::SkipContent,
            Choice::SkipSelector,
            Choice::SkipMissingSelector,
        ],
    ),
    ("Update", &[Choice::UpdateHistory]),
];

impl Choice {
    fn label(self) -> &'static str {
        match self {
            Self::Keep => "Keep: Version is fine",
            Self::Bypass => "Bypass: Decide later",
            Self::Retry => "Retry: Declaration updated",
            Self::ShowDate => "Show: Snapshot date",
            Self::ShowData => "Show: Snapshot data",
            Self::ShowSnapshot => "Show: HTML snapshot",
            Self::ShowDeclaration => "Show: Current declaration used",
            Self::Skip => "Skip: Content of this snapshot is unprocessable",
            Self::SkipContent => "Define content: Skip when content within selector is found",
            Self::SkipSelector => "Define selector: Skip when this selector is found",
            Self::SkipMissingSelector => "Define selector: Skip when this selector is NOT found",
            Self::UpdateHistory => "Update: Add entry in history (the declaration still needs fixing)",
        }
    }
}

const END_CHOICES: &[(EndDecision, &str)] = &[
    (EndDecision::MarkAsDone, "All is ok, mark it as done"),
    (EndDecision::RestartNonInteractive, "Restart in non interactive mode"),
    (EndDecision::Quit, "Quit"),
];

/// Asks the operator through numbered menus read line by line.
pub struct PromptAdjudicator<R, W> {
    input: R,
    output: W,
    theme: Theme,
}

impl PromptAdjudicator<StdinLock<'static>, Stdout> {
    pub fn stdio(theme: Theme) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), theme)
    }
}

impl<R: BufRead, W: Write> PromptAdjudicator<R, W> {
    pub fn new(input: R, output: W, theme: Theme) -> Self {
        Self {
            input,
            output,
            theme,
        }
    }

    /// Whether to continue the previous run from its checkpoint.
    pub fn confirm_resume(&mut self, progress: &ProgressCheckpoint) -> Result<bool> {
        let question = format!(
            "Would you like to resume the previous run from {} at snapshot ID \"{}\"?",
            progress.date, progress.snapshot_id
        );
        let labels = [
            "Yes, resume previous run",
            "No, reset the progress and restart from the beginning",
        ];
        Ok(self.pick(&question, &labels)? == 0)
    }

    fn pick(&mut self, question: &str, labels: &[&str]) -> Result<usize> {
        writeln!(self.output, "{}", self.theme.accent_text(question))?;
        for (i, label) in labels.iter().enumerate() {
            writeln!(self.output, "  {:>2}) {}", i + 1, label)?;
        }
        loop {
            let answer = self.read_line("> ")?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=labels.len()).contains(&n) => return Ok(n - 1),
                _ => writeln!(
                    self.output,
                    "{}",
                    self.theme
                        .error_text(&format!("Enter a number between 1 and {}", labels.len()))
                )?,
            }
        }
    }

    fn choose(&mut self, question: &str, has_version: bool) -> Result<Choice> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", self.theme.accent_text(question))?;
        let mut numbered = Vec::new();
        for (section, choices) in MENU {
            writeln!(self.output, "  {}", self.theme.secondary_text(section))?;
            for &choice in *choices {
                if choice == Choice::Keep && !has_version {
                    continue;
                }
                numbered.push(choice);
                writeln!(self.output, "  {:>2}) {}", numbered.len(), choice.label())?;
            }
        }

        loop {
            let answer = self.read_line("> ")?;
            match answer.parse::<usize>() {
                Ok(n) if (1..=numbered.len()).contains(&n) => return Ok(numbered[n - 1]),
                _ => writeln!(
                    self.output,
                    "{}",
                    self.theme
                        .error_text(&format!("Enter a number between 1 and {}", numbered.len()))
                )?,
            }
        }
    }

    /// Non-empty answer to a free-text question, `None` when left blank.
    fn ask_text(&mut self, question: &str) -> Result<Option<String>> {
        let answer = self.read_line(&format!("{} ", question))?;
        Ok(if answer.is_empty() { None } else { Some(answer) })
    }

    fn pause(&mut self) -> Result<()> {
        self.read_line("Press Enter to continue")?;
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", self.theme.primary_text(prompt))?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(RegenError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "standard input closed while waiting for an answer",
            )));
        }
        Ok(line.trim().to_string())
    }

    fn show(&mut self, choice: Choice, review: &Review<'_>) -> Result<()> {
        let snapshot = review.snapshot;
        match choice {
            Choice::ShowDate => {
                writeln!(
                    self.output,
                    "\n{}\n",
                    snapshot.fetch_date.to_rfc3339_opts(SecondsFormat::Millis, true)
                )?;
            }
            Choice::ShowData => {
                writeln!(self.output, "id:           {}", snapshot.id)?;
                writeln!(self.output, "serviceId:    {}", snapshot.service_id)?;
                writeln!(self.output, "documentType: {}", snapshot.document_type)?;
                if let Some(page_id) = &snapshot.page_id {
                    writeln!(self.output, "pageId:       {}", page_id)?;
                }
                writeln!(
                    self.output,
                    "fetchDate:    {}",
                    snapshot.fetch_date.to_rfc3339_opts(SecondsFormat::Millis, true)
                )?;
                writeln!(self.output, "mimeType:     {}", snapshot.mime_type)?;
                writeln!(self.output, "content:      {} bytes", snapshot.content.len())?;
            }
            Choice::ShowSnapshot => {
                let width = terminal_size::terminal_size()
                    .map(|(w, _)| w.0 as usize)
                    .unwrap_or(RULE_WIDTH_FALLBACK);
                let rule = self.theme.secondary_text(&"─".repeat(width));
                writeln!(
                    self.output,
                    "\n{}\n{}\n{}\n",
                    rule,
                    self.theme.accent_text(review.fingerprint),
                    rule
                )?;
                writeln!(self.output, "- Open it in your browser")?;
                writeln!(self.output, "{}", review.review_path.display())?;
                if let Some(url) = &review.snapshot_url {
                    writeln!(self.output, "\n- Or see it online")?;
                    writeln!(self.output, "{}", url)?;
                }
            }
            Choice::ShowDeclaration => match review.declaration {
                Some(declaration) => {
                    let json = serde_json::to_string_pretty(&declaration.to_json())?;
                    writeln!(self.output, "{}", json)?;
                }
                None => writeln!(
                    self.output,
                    "{}",
                    self.theme.error_text("No declaration is valid for this snapshot")
                )?,
            },
            _ => return Ok(()),
        }
        self.pause()
    }
}

impl<R: BufRead, W: Write> Adjudicator for PromptAdjudicator<R, W> {
    fn present(&mut self, presentation: Presentation<'_>) {
        let _ = writeln!(self.output, "{}", render(&self.theme, presentation));
    }

    fn decide(&mut self, review: &Review<'_>) -> Result<Decision> {
        loop {
            let choice = self.choose(&review.question, review.version.is_some())?;
            let decision = match choice {
                Choice::Keep => Decision::Keep,
                Choice::Bypass => Decision::Bypass,
                Choice::Retry => Decision::Retry,
                Choice::Skip => Decision::SkipSnapshot,
                Choice::UpdateHistory => Decision::UpdateHistory,
                Choice::SkipContent => {
                    let Some(selector) =
                        self.ask_text("CSS selector content will be selected from:")?
                    else {
                        continue;
                    };
                    let Some(value) = self.ask_text(
                        "innerHTML which, if exactly the same as the content of the selector above, will have the snapshot skipped:",
                    )?
                    else {
                        continue;
                    };
                    Decision::SkipContent { selector, value }
                }
                Choice::SkipSelector => {
                    match self.ask_text(
                        "CSS selector which, if present in the snapshot, will have it skipped:",
                    )? {
                        Some(selector) => Decision::SkipSelector(selector),
                        None => continue,
                    }
                }
                Choice::SkipMissingSelector => {
                    match self.ask_text(
                        "CSS selector which, if absent from the snapshot, will have it skipped:",
                    )? {
                        Some(selector) => Decision::SkipMissingSelector(selector),
                        None => continue,
                    }
                }
                Choice::ShowDate
                | Choice::ShowData
                | Choice::ShowSnapshot
                | Choice::ShowDeclaration => {
                    self.show(choice, review)?;
                    continue;
                }
            };
            return Ok(decision);
        }
    }

    fn conclude(&mut self, _service_id: &str, _document_type: &str) -> Result<EndDecision> {
        let labels: Vec<&str> = END_CHOICES.iter().map(|(_, label)| *label).collect();
        let index = self.pick(
            "All snapshots have been analyzed. What do you want to do?",
            &labels,
        )?;
        Ok(END_CHOICES[index].0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use regen::snapshots::Snapshot;
    use std::io::Cursor;
    use std::path::Path;

    fn snapshot() -> Snapshot {
        Snapshot {
            id: "abc123".to_string(),
            service_id: "svc".to_string(),
            document_type: "tos".to_string(),
            page_id: None,
            fetch_date: Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap(),
            content: "<p>Terms</p>".to_string(),
            mime_type: "text/html".to_string(),
        }
    }

    fn review<'a>(snapshot: &'a Snapshot, version: Option<&'a str>) -> Review<'a> {
        Review {
            question: "Is it valid?".to_string(),
            snapshot,
            declaration: None,
            version,
            fingerprint: "Terms",
            review_path: Path::new("/tmp/to-check/svc/tos/a.html"),
            snapshot_url: Some("https://example.com/commit/abc123".to_string()),
        }
    }

    fn prompt(input: &str) -> PromptAdjudicator<Cursor<Vec<u8>>, Vec<u8>> {
        PromptAdjudicator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), Theme::plain())
    }

    #[test]
    fn keep_is_only_offered_with_a_version() {
        let snapshot = snapshot();

        let mut with_version = prompt("1\n");
        assert_eq!(
            with_version.decide(&review(&snapshot, Some("Terms"))).unwrap(),
            Decision::Keep
        );

        let mut without_version = prompt("1\n");
        assert_eq!(
            without_version.decide(&review(&snapshot, None)).unwrap(),
            Decision::Bypass
        );
        let menu = String::from_utf8(without_version.output).unwrap();
        assert!(!menu.contains("Keep: Version is fine"));
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let snapshot = snapshot();
        let mut prompt = prompt("x\n42\n3\n");

        assert_eq!(
            prompt.decide(&review(&snapshot, Some("Terms"))).unwrap(),
            Decision::Retry
        );
        let output = String::from_utf8(prompt.output).unwrap();
        assert_eq!(output.matches("Enter a number between 1 and 12").count(), 2);
    }

    #[test]
    fn show_options_return_to_the_menu() {
        let snapshot = snapshot();
        // Show date, continue, show HTML snapshot, continue, then Skip
        let mut prompt = prompt("4\n\n6\n\n8\n");

        assert_eq!(
            prompt.decide(&review(&snapshot, Some("Terms"))).unwrap(),
            Decision::SkipSnapshot
        );
        let output = String::from_utf8(prompt.output).unwrap();
        assert!(output.contains("2023-01-02T03:04:05.000Z"));
        assert!(output.contains("/tmp/to-check/svc/tos/a.html"));
        assert!(output.contains("https://example.com/commit/abc123"));
    }

    #[test]
    fn skip_content_asks_for_selector_and_value() {
        let snapshot = snapshot();
        let mut prompt = prompt("9\n.banner\n<p>Closed</p>\n");

        assert_eq!(
            prompt.decide(&review(&snapshot, Some("Terms"))).unwrap(),
            Decision::SkipContent {
                selector: ".banner".to_string(),
                value: "<p>Closed</p>".to_string(),
            }
        );
    }

    #[test]
    fn blank_selector_goes_back_to_the_menu() {
        let snapshot = snapshot();
        let mut prompt = prompt("10\n\n10\n#content\n");

        assert_eq!(
            prompt.decide(&review(&snapshot, None)).unwrap(),
            Decision::SkipMissingSelector("#content".to_string())
        );
    }

    #[test]
    fn closed_input_is_an_error() {
        let snapshot = snapshot();
        let err = prompt("").decide(&review(&snapshot, None)).unwrap_err();
        assert!(matches!(err, RegenError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn end_menu_and_resume_question() {
        assert_eq!(
            prompt("1\n").conclude("svc", "tos").unwrap(),
            EndDecision::MarkAsDone
        );
        assert_eq!(
            prompt("2\n").conclude("svc", "tos").unwrap(),
            EndDecision::RestartNonInteractive
        );

        let progress = ProgressCheckpoint {
            snapshot_id: "abc123".to_string(),
            index: 4,
            date: "Mon, 2 Jan 2023 03:04:05 +0000".to_string(),
            pending: Vec::new(),
        };
        assert!(prompt("1\n").confirm_resume(&progress).unwrap());
        assert!(!prompt("2\n").confirm_resume(&progress).unwrap());
    }
}
