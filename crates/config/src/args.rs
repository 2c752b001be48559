//! Config given as command line arguments

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use model::{
    AdminAction, AdminQueue, Category, OperationalStatus, ReportId, UrgencyLevel, UserId,
};

use crate::file::CONFIG_FILE_NAME;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ArgsConfig {
    /// Config file. Default config is created if the file does not exist.
    #[arg(long, default_value = CONFIG_FILE_NAME, value_name = "FILE")]
    pub config_file: PathBuf,

    /// Override database directory from the config file.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Use in RAM SQLite database. Data is lost when the command exits.
    #[arg(long)]
    pub sqlite_in_ram: bool,

    #[command(subcommand)]
    pub mode: AppMode,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AppMode {
    /// Submit a report and run the verification pipeline
    Submit(SubmitArgs),
    /// Print one report
    Show {
        id: ReportId,
    },
    /// List reports in an admin review queue
    Queue {
        /// manual_pending, ai_rejected, spam or previously_rejected
        queue: AdminQueue,
    },
    /// List reports with the given operational status
    ListStatus {
        status: OperationalStatus,
    },
    /// List reports of a submitter
    ListSubmitter {
        user: UserId,
    },
    /// Apply an admin decision to the verification state of a report
    Decide(DecideArgs),
    /// Move a verified report forward in its operational lifecycle
    Status(StatusArgs),
    /// Print report statistics
    Stats {
        /// Only count reports created during the last hours
        #[arg(long, value_name = "HOURS")]
        since_hours: Option<u32>,
    },
    /// List verified reports which have waited too long
    Urgent,
    /// List notifications of a user
    Notifications {
        user: UserId,
    },
    /// Mark notification as read
    MarkRead {
        user: UserId,
        id: model::NotificationId,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    #[arg(long)]
    pub submitter: UserId,
    #[arg(long)]
    pub category: Category,
    #[arg(long, default_value = "medium")]
    pub urgency: UrgencyLevel,
    /// Location in format "latitude,longitude"
    #[arg(long)]
    pub location: String,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub affected_people: u32,
    /// Report has an image attachment
    #[arg(long)]
    pub image: bool,
    /// Report has an audio attachment
    #[arg(long)]
    pub audio: bool,
    pub description: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminActionArg {
    ManualVerify,
    ReVerify,
    OverrideAi,
    OverrideSpam,
}

#[derive(Args, Debug, Clone)]
pub struct DecideArgs {
    pub id: ReportId,
    #[arg(value_enum)]
    pub action: AdminActionArg,
    /// Verified for verify and override-ai actions. Is spam for the
    /// override-spam action.
    #[arg(long, action = ArgAction::Set)]
    pub value: bool,
    #[arg(long)]
    pub reason: String,
    /// Fail with a conflict if the report version is not this.
    #[arg(long)]
    pub expected_version: Option<i64>,
}

impl DecideArgs {
    pub fn admin_action(&self) -> AdminAction {
        match self.action {
            AdminActionArg::ManualVerify => AdminAction::ManualVerify {
                verified: self.value,
            },
            AdminActionArg::ReVerify => AdminAction::ReVerify {
                verified: self.value,
            },
            AdminActionArg::OverrideAi => AdminAction::OverrideAi {
                verified: self.value,
            },
            AdminActionArg::OverrideSpam => AdminAction::OverrideSpam {
                is_spam: self.value,
            },
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    pub id: ReportId,
    /// in_progress or resolved
    pub status: OperationalStatus,
    /// Act as this submitter instead of as an admin.
    #[arg(long)]
    pub submitter: Option<UserId>,
    /// Fail with a conflict if the report version is not this.
    #[arg(long)]
    pub expected_version: Option<i64>,
}
