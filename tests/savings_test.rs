mod common;

use anyhow::Result;
use common::{parse_date, register, test_app};
use pocketbook::application::AppError;
use pocketbook::domain::DEFAULT_SAVINGS_GOAL_NAME;

#[tokio::test]
async fn test_goal_is_created_on_first_use() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let savings = app.ctx.savings();

    let goal = savings.get_or_create(alice.id).await?;
    assert_eq!(goal.name, DEFAULT_SAVINGS_GOAL_NAME);
    assert_eq!(goal.target_cents, 0);
    assert_eq!(goal.current_cents, 0);
    assert_eq!(savings.progress(alice.id).await?, 0.0);

    let again = savings.get_or_create(alice.id).await?;
    assert_eq!(again.id, goal.id);

    Ok(())
}

#[tokio::test]
async fn test_target_and_contributions() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let savings = app.ctx.savings();

    let goal = savings
        .set_target(alice.id, 100000, Some(parse_date("2024-12-31")))
        .await?;
    assert_eq!(goal.target_cents, 100000);
    assert_eq!(goal.deadline, Some(parse_date("2024-12-31")));

    savings.add_contribution(alice.id, 25000).await?;
    let goal = savings.add_contribution(alice.id, 15000).await?;
    assert_eq!(goal.current_cents, 40000);
    assert!((savings.progress(alice.id).await? - 40.0).abs() < 1e-9);
    assert!(!goal.is_reached());

    // A new target without a deadline keeps the old deadline
    let goal = savings.set_target(alice.id, 40000, None).await?;
    assert_eq!(goal.deadline, Some(parse_date("2024-12-31")));
    assert!(goal.is_reached());

    Ok(())
}

#[tokio::test]
async fn test_progress_is_capped() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let savings = app.ctx.savings();

    savings.set_target(alice.id, 100, None).await?;
    savings.add_contribution(alice.id, 500000).await?;
    assert_eq!(savings.progress(alice.id).await?, 999.0);

    Ok(())
}

#[tokio::test]
async fn test_invalid_amounts_and_isolation() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let bob = register(&app, "bob").await?;
    let savings = app.ctx.savings();

    assert!(matches!(
        savings.set_target(alice.id, 0, None).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        savings.add_contribution(alice.id, -100).await,
        Err(AppError::Validation(_))
    ));

    savings.add_contribution(alice.id, 5000).await?;
    let bobs = savings.get_or_create(bob.id).await?;
    assert_eq!(bobs.current_cents, 0);

    Ok(())
}
