//! State and transitions for the interactive dashboard.
//!
//! Everything here is synchronous and free of terminal I/O: the event loop
//! feeds [`Action`]s in, and carries out the [`Effect`]s that come back.

use chrono::NaiveDate;
use spendboard_api::{ApiError, SelectedFile, UploadResponse, UploadState, UploadWorkflow};
use spendboard_core::{
    DateRange, DateRangeSelector, Feedback, Granularity, RangePreset, Snapshot, Transaction,
};
use std::time::{Duration, Instant};

/// How long warning/info toasts stay on screen
pub const TOAST_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Upload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Load {
    Loading,
    Loaded(Vec<Transaction>),
    Failed(String),
}

#[derive(Debug)]
pub enum Action {
    /// `today` is the local date when the key was pressed
    SelectRange { preset: RangePreset, today: NaiveDate },
    SetView(Granularity),
    Refetch,
    OpenUpload,
    Back,
    Input(char),
    Backspace,
    Submit,
    Dismiss,
    FetchCompleted {
        request_id: u64,
        result: Result<Vec<Transaction>, String>,
    },
    UploadCompleted(Result<UploadResponse, ApiError>),
    Tick(Instant),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch { request_id: u64, range: DateRange },
    Upload(Vec<SelectedFile>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub feedback: Feedback,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct DashboardState {
    pub today: NaiveDate,
    pub selector: DateRangeSelector,
    pub view: Granularity,
    pub screen: Screen,
    pub load: Load,
    pub upload: UploadWorkflow,
    /// Paths typed on the upload screen, whitespace separated
    pub upload_input: String,
    /// Modal raised outside the upload request itself (e.g. nothing to upload)
    pub modal: Option<Toast>,
    pub toasts: Vec<Toast>,
    pub quit: bool,
    latest_request: u64,
}

impl DashboardState {
    pub fn new(preset: RangePreset, view: Granularity, today: NaiveDate) -> Self {
        Self {
            today,
            selector: DateRangeSelector::new(preset, today),
            view,
            screen: Screen::Dashboard,
            load: Load::Loading,
            upload: UploadWorkflow::new(),
            upload_input: String::new(),
            modal: None,
            toasts: Vec::new(),
            quit: false,
            latest_request: 0,
        }
    }

    /// First fetch for the initial range
    pub fn start(&mut self) -> Vec<Effect> {
        vec![self.fetch()]
    }

    pub fn range(&self) -> &DateRange {
        self.selector.current()
    }

    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }

    pub fn transactions(&self) -> &[Transaction] {
        match &self.load {
            Load::Loaded(t) => t,
            _ => &[],
        }
    }

    /// Derived numbers for the current list and view
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::compute(self.transactions(), self.view)
    }

    /// Error modal to show, if any: local notices first, then the upload error
    pub fn error_modal(&self) -> Option<&Feedback> {
        if let Some(t) = &self.modal {
            return Some(&t.feedback);
        }
        match self.upload.state() {
            UploadState::Error(fb) => Some(fb),
            _ => None,
        }
    }

    fn fetch(&mut self) -> Effect {
        self.latest_request += 1;
        self.load = Load::Loading;
        Effect::Fetch {
            request_id: self.latest_request,
            range: self.range().clone(),
        }
    }

    fn push_notice(&mut self, feedback: Feedback, now: Instant) {
        let toast = Toast {
            feedback,
            expires_at: now + TOAST_TTL,
        };
        if toast.feedback.is_error() {
            self.modal = Some(toast);
        } else {
            self.toasts.push(toast);
        }
    }

    fn submit_upload(&mut self, now: Instant) -> Vec<Effect> {
        let selection: Vec<SelectedFile> = self
            .upload_input
            .split_whitespace()
            .map(SelectedFile::from_path)
            .collect();

        let pdfs = self.upload.begin(&selection);
        for notice in self.upload.take_notices() {
            self.push_notice(notice, now);
        }
        match pdfs {
            Some(pdfs) => {
                self.upload_input.clear();
                vec![Effect::Upload(pdfs)]
            }
            None => Vec::new(),
        }
    }

    pub fn reduce(&mut self, action: Action, now: Instant) -> Vec<Effect> {
        // any key press cancels a pending post-upload redirect
        if !matches!(
            action,
            Action::Tick(_) | Action::FetchCompleted { .. } | Action::UploadCompleted(_)
        ) {
            self.upload.cancel_redirect();
        }

        match action {
            Action::Quit => {
                self.quit = true;
                Vec::new()
            }

            Action::Dismiss => {
                if self.modal.take().is_none() {
                    self.upload.dismiss_error();
                }
                Vec::new()
            }

            Action::SelectRange { preset, today } => {
                let unchanged =
                    self.selector.preset() == Some(preset) && preset.resolve(today) == *self.range();
                self.today = today;
                if unchanged {
                    return Vec::new();
                }
                self.selector.apply(preset, today);
                vec![self.fetch()]
            }

            Action::SetView(view) => {
                self.view = view;
                Vec::new()
            }

            Action::Refetch => vec![self.fetch()],

            Action::OpenUpload => {
                self.screen = Screen::Upload;
                self.upload.reset();
                Vec::new()
            }

            Action::Back => {
                self.screen = Screen::Dashboard;
                Vec::new()
            }

            Action::Input(c) => {
                self.upload_input.push(c);
                Vec::new()
            }

            Action::Backspace => {
                self.upload_input.pop();
                Vec::new()
            }

            Action::Submit => {
                if self.screen != Screen::Upload {
                    return Vec::new();
                }
                if self.upload.state().is_terminal() {
                    // "Upload More Files"
                    self.upload.reset();
                }
                self.submit_upload(now)
            }

            Action::FetchCompleted { request_id, result } => {
                if request_id != self.latest_request {
                    // stale response from an earlier range
                    return Vec::new();
                }
                self.load = match result {
                    Ok(txns) => Load::Loaded(txns),
                    Err(e) => Load::Failed(e),
                };
                Vec::new()
            }

            Action::UploadCompleted(result) => {
                self.upload.finish(result, now);
                if self.upload.take_refetch() {
                    vec![self.fetch()]
                } else {
                    Vec::new()
                }
            }

            Action::Tick(now) => {
                if self.upload.poll_redirect(now) {
                    self.screen = Screen::Dashboard;
                }
                self.upload.poll_error_timeout(now);
                if self.modal.as_ref().is_some_and(|m| now >= m.expires_at) {
                    self.modal = None;
                }
                self.toasts.retain(|t| now < t.expires_at);
                Vec::new()
            }
        }
    }
}
