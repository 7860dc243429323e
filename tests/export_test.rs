mod common;

use anyhow::Result;
use common::{expense, income, register, test_app};
use pocketbook::domain::{BudgetPeriod, BudgetScope, NewBudget, TransactionFilter, YearMonth};
use pocketbook::io::Exporter;

#[tokio::test]
async fn test_transactions_csv() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let bob = register(&app, "bob").await?;

    expense(&app, &alice, "2024-03-05", "Food", 1250).await?;
    income(&app, &alice, "2024-03-01", 250000).await?;
    expense(&app, &bob, "2024-03-02", "Games", 999).await?;

    let mut out = Vec::new();
    let count = Exporter::new(&app.ctx)
        .transactions_csv(alice.id, &TransactionFilter::default(), &mut out)
        .await?;
    assert_eq!(count, 2);

    let text = String::from_utf8(out)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,date,kind,category,description,amount");
    assert!(lines[1].contains(",2024-03-01,income,Salary,"));
    assert!(lines[1].ends_with(",2500.00"));
    assert!(lines[2].contains(",2024-03-05,expense,Food,"));
    assert!(lines[2].ends_with(",12.50"));
    assert!(!text.contains("Games"));

    Ok(())
}

#[tokio::test]
async fn test_user_json_snapshot() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;

    expense(&app, &alice, "2024-03-05", "Food", 1250).await?;
    app.ctx
        .budgets()
        .create_budget(
            alice.id,
            NewBudget {
                scope: BudgetScope::Overall,
                period: BudgetPeriod::month(YearMonth::new(2024, 3).unwrap()),
                limit_cents: 50000,
            },
        )
        .await?;

    let mut out = Vec::new();
    let snapshot = Exporter::new(&app.ctx).user_json(alice.id, &mut out).await?;
    assert_eq!(snapshot.username, "alice");
    assert_eq!(snapshot.transactions.len(), 1);
    assert_eq!(snapshot.budgets.len(), 1);
    assert!(snapshot.savings_goal.is_none());

    let json: serde_json::Value = serde_json::from_slice(&out)?;
    assert_eq!(json["transactions"][0]["amount_cents"], 1250);
    // Password hashes never leave the database
    assert!(!String::from_utf8(out)?.contains("argon2"));

    Ok(())
}
