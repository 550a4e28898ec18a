use judge_panel::hardening::*;
use judge_panel::types::*;

#[tokio::test]
async fn test_retry_policy_success() {
    let policy = RetryPolicy::new(3, 1);
    let mut attempts = 0;

    let result: judge_panel::types::Result<i32> = policy
        .execute_with_retry(|| {
            attempts += 1;
            async move { Ok(42) }
        })
        .await;

    match result {
        Ok(val) => assert_eq!(val, 42),
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn test_retry_policy_eventual_success() {
    let policy = RetryPolicy::new(3, 1);
    let mut attempts = 0;

    let result: judge_panel::types::Result<i32> = policy
        .execute_with_retry(|| {
            attempts += 1;
            let a = attempts;
            async move {
                if a < 3 {
                    Err(PanelError::Upstream(
                        reqwest::StatusCode::BAD_GATEWAY,
                        "upstream hiccup".to_string(),
                    )
                    .into())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    match result {
        Ok(val) => assert_eq!(val, 42),
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn test_retry_policy_gives_up_after_max_attempts() {
    let policy = RetryPolicy::new(2, 1);
    let mut attempts = 0;

    let result: judge_panel::types::Result<i32> = policy
        .execute_with_retry(|| {
            attempts += 1;
            async move {
                Err(PanelError::Upstream(
                    reqwest::StatusCode::TOO_MANY_REQUESTS,
                    "rate limited".to_string(),
                )
                .into())
            }
        })
        .await;

    let err = result.expect_err("should fail after retries");
    assert!(matches!(err.inner, PanelError::Upstream(status, _) if status.as_u16() == 429));
    assert_eq!(attempts, 2);
}

#[tokio::test]
async fn test_non_retryable_errors_fail_fast() {
    let policy = RetryPolicy::new(5, 1);
    let mut attempts = 0;

    let result: judge_panel::types::Result<i32> = policy
        .execute_with_retry(|| {
            attempts += 1;
            async move { Err(PanelError::Protocol("bad chunk".to_string()).into()) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn test_zero_attempts_still_runs_once() {
    let policy = RetryPolicy::new(0, 1);
    let mut attempts = 0;

    let _: judge_panel::types::Result<()> = policy
        .execute_with_retry(|| {
            attempts += 1;
            async move { Err(PanelError::Timeout(std::time::Duration::from_secs(1)).into()) }
        })
        .await;

    assert_eq!(attempts, 1);
}
