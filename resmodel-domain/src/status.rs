use crate::error::{ModelError, ModelResult};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// 请求状态标志
///
/// `loading`/`saving`/`deleting` 表示对应动作在途，`fatal` 独立于三者，
/// 在传输失败时置位，只在下一次保存开始时清除。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub loading: bool,
    pub saving: bool,
    pub deleting: bool,
    pub fatal: bool,
}

impl Status {
    pub fn is_idle(&self) -> bool {
        !(self.loading || self.saving || self.deleting)
    }

    /// 保存或删除在途
    pub fn is_busy(&self) -> bool {
        self.saving || self.deleting
    }
}

/// 在途动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    Loading,
    Saving,
    Deleting,
}

impl Activity {
    fn flag(self, status: &mut Status) -> &mut bool {
        match self {
            Activity::Loading => &mut status.loading,
            Activity::Saving => &mut status.saving,
            Activity::Deleting => &mut status.deleting,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatusCell(Mutex<Status>);

impl StatusCell {
    fn lock(&self) -> MutexGuard<'_, Status> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn snapshot(&self) -> Status {
        *self.lock()
    }

    pub(crate) fn set_fatal(&self, fatal: bool) {
        self.lock().fatal = fatal;
    }

    pub(crate) fn clear(&self) {
        *self.lock() = Status::default();
    }

    /// 无条件进入某个动作（拉取/删除）
    pub(crate) fn begin(&self, activity: Activity) -> InFlight<'_> {
        *activity.flag(&mut self.lock()) = true;
        InFlight {
            cell: self,
            activity,
        }
    }

    /// 进入保存：已有保存或删除在途时立即拒绝；
    /// `gate` 在持锁期间执行（通常是本地校验），失败则不置位。
    pub(crate) fn begin_save<F>(&self, uid: &str, gate: F) -> ModelResult<InFlight<'_>>
    where
        F: FnOnce() -> ModelResult<()>,
    {
        let mut status = self.lock();
        if status.is_busy() {
            warn!(uid, "save rejected: already saving or deleting");
            return Err(ModelError::conflict("already saving or deleting"));
        }

        gate()?;

        status.saving = true;
        status.fatal = false;
        Ok(InFlight {
            cell: self,
            activity: Activity::Saving,
        })
    }
}

/// 在途守卫：析构时清除对应标志（包括 future 被丢弃的情况）
pub(crate) struct InFlight<'a> {
    cell: &'a StatusCell,
    activity: Activity,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.activity.flag(&mut self.cell.lock()) = false;
    }
}
