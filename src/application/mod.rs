//! 应用层用例：地址空间探索与写入验证的编排。

pub mod explorer;
pub mod verify;

use anyhow::Result;

use crate::ports::session::UaSession;

/// 会话作用域包装：无论用例成功与否，结束时都尝试断开一次。
/// 断开本身是尽力而为（见端口约定），不影响返回结果。
pub fn run_with_session<S, F, T>(session: S, f: F) -> Result<T>
where
    S: UaSession,
    F: FnOnce(&S) -> Result<T>,
{
    let result = f(&session);
    session.disconnect();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::adapters::mock::MockSession;

    #[test]
    fn disconnect_runs_on_the_success_path() {
        let session = MockSession::new();
        let probe = session.clone();
        let value = run_with_session(session, |_| Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert_eq!(probe.disconnect_count(), 1);
    }

    #[test]
    fn disconnect_runs_when_the_use_case_fails() {
        let session = MockSession::new();
        let probe = session.clone();
        let result: Result<()> = run_with_session(session, |_| anyhow::bail!("mid-run failure"));
        assert!(result.is_err());
        assert_eq!(probe.disconnect_count(), 1);
    }
}
