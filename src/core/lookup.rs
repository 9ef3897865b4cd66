use crate::domain::model::Procedure;
use crate::utils::error::{BackupError, Result};

/// 依 trigger 找出要執行的程序。
///
/// `None` 表示呼叫端不需要解析（例如只列出 trigger），直接回傳 `Ok(None)`，
/// 呼叫端不應再進行 dispatch。
pub fn resolve<'a>(trigger: Option<&str>, procedures: &'a [Procedure]) -> Result<Option<&'a Procedure>> {
    match trigger {
        Some(trigger) => find_procedure(trigger, procedures).map(Some),
        None => {
            tracing::debug!("No trigger given, skipping procedure resolution");
            Ok(None)
        }
    }
}

/// 依序掃描，回傳第一個 trigger 完全相同的程序；重複的 trigger 以先出現者為準
pub fn find_procedure<'a>(trigger: &str, procedures: &'a [Procedure]) -> Result<&'a Procedure> {
    procedures
        .iter()
        .find(|procedure| procedure.trigger == trigger)
        .ok_or_else(|| BackupError::ProcedureNotFound {
            trigger: trigger.to_string(),
            available: procedures.iter().map(|p| p.trigger.clone()).collect(),
        })
}
