mod common;

use anyhow::Result;
use common::{expense, income, parse_date, register, test_app};
use pocketbook::domain::{DateRange, YearMonth};

fn month(year: i32, month: u32) -> YearMonth {
    YearMonth::new(year, month).unwrap()
}

#[tokio::test]
async fn test_monthly_net_and_running_balance() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let reports = app.ctx.reports();

    // Recorded out of date order on purpose
    expense(&app, &alice, "2024-03-10", "Food", 200).await?;
    income(&app, &alice, "2024-03-01", 1000).await?;
    expense(&app, &alice, "2024-03-05", "Rent", 300).await?;

    let range = DateRange::month(month(2024, 3));
    let months = reports.monthly_net(alice.id, range).await?;
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].month, month(2024, 3));
    assert_eq!(months[0].income, 1000);
    assert_eq!(months[0].expense, 500);
    assert_eq!(months[0].net, 500);

    let balances: Vec<i64> = reports
        .running_balance(alice.id, range, None)
        .await?
        .iter()
        .map(|p| p.balance)
        .collect();
    assert_eq!(balances, vec![1000, 700, 500]);

    Ok(())
}

#[tokio::test]
async fn test_monthly_net_fills_quiet_months() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;

    income(&app, &alice, "2024-01-15", 5000).await?;
    expense(&app, &alice, "2024-03-02", "Food", 1200).await?;

    let months = app
        .ctx
        .reports()
        .monthly_net(alice.id, DateRange::all())
        .await?;
    let summary: Vec<_> = months.iter().map(|m| (m.month, m.net)).collect();
    assert_eq!(
        summary,
        vec![
            (month(2024, 1), 5000),
            (month(2024, 2), 0),
            (month(2024, 3), -1200)
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_running_balance_opening() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let reports = app.ctx.reports();

    income(&app, &alice, "2024-02-01", 10000).await?;
    expense(&app, &alice, "2024-02-20", "Food", 2500).await?;
    expense(&app, &alice, "2024-03-03", "Food", 1000).await?;

    let march = DateRange::month(month(2024, 3));

    // Carries over everything before the range
    let carried = reports.running_balance(alice.id, march, None).await?;
    assert_eq!(carried.len(), 1);
    assert_eq!(carried[0].balance, 6500);

    let explicit = reports.running_balance(alice.id, march, Some(0)).await?;
    assert_eq!(explicit[0].balance, -1000);

    // Unbounded range starts from zero
    let everything = reports
        .running_balance(alice.id, DateRange::all(), None)
        .await?;
    let balances: Vec<i64> = everything.iter().map(|p| p.balance).collect();
    assert_eq!(balances, vec![10000, 7500, 6500]);

    Ok(())
}

#[tokio::test]
async fn test_running_balance_same_day_follows_recording_order() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;

    let first = expense(&app, &alice, "2024-03-05", "Food", 100).await?;
    let second = income(&app, &alice, "2024-03-05", 1000).await?;

    let points = app
        .ctx
        .reports()
        .running_balance(alice.id, DateRange::all(), None)
        .await?;
    assert_eq!(points[0].transaction_id, first.id);
    assert_eq!(points[0].balance, -100);
    assert_eq!(points[1].transaction_id, second.id);
    assert_eq!(points[1].balance, 900);

    Ok(())
}

#[tokio::test]
async fn test_category_breakdown() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let bob = register(&app, "bob").await?;

    expense(&app, &alice, "2024-03-01", "Food", 3000).await?;
    expense(&app, &alice, "2024-03-12", "Food", 1500).await?;
    expense(&app, &alice, "2024-03-20", "Rent", 5500).await?;
    income(&app, &alice, "2024-03-25", 90000).await?;
    expense(&app, &alice, "2024-04-02", "Travel", 8000).await?;
    expense(&app, &bob, "2024-03-02", "Games", 999).await?;

    let breakdown = app
        .ctx
        .reports()
        .category_breakdown(alice.id, DateRange::month(month(2024, 3)))
        .await?;

    assert_eq!(breakdown.totals.len(), 2);
    assert_eq!(breakdown.totals["Food"], 4500);
    assert_eq!(breakdown.totals["Rent"], 5500);
    assert_eq!(breakdown.total, 10000);
    assert!((breakdown.share("Food") - 45.0).abs() < 1e-9);
    assert!(!breakdown.totals.contains_key("Salary"));
    assert!(!breakdown.totals.contains_key("Travel"));

    Ok(())
}

#[tokio::test]
async fn test_summary_and_week_presets() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let reports = app.ctx.reports();

    // 2024-03-15 is a Friday; this week starts Monday 2024-03-11
    income(&app, &alice, "2024-03-11", 4000).await?;
    expense(&app, &alice, "2024-03-14", "Food", 1500).await?;
    expense(&app, &alice, "2024-03-08", "Food", 700).await?;

    let today = parse_date("2024-03-15");
    let this_week = reports
        .summary(alice.id, DateRange::this_week(today))
        .await?;
    assert_eq!(this_week.income, 4000);
    assert_eq!(this_week.expense, 1500);
    assert_eq!(this_week.net, 2500);

    let last_week = reports
        .summary(alice.id, DateRange::last_week(today))
        .await?;
    assert_eq!(last_week.income, 0);
    assert_eq!(last_week.expense, 700);
    assert_eq!(last_week.net, -700);

    Ok(())
}

#[tokio::test]
async fn test_reports_on_empty_history() -> Result<()> {
    let (app, _temp) = test_app().await?;
    let alice = register(&app, "alice").await?;
    let reports = app.ctx.reports();

    assert!(reports.monthly_net(alice.id, DateRange::all()).await?.is_empty());
    assert!(
        reports
            .running_balance(alice.id, DateRange::all(), None)
            .await?
            .is_empty()
    );
    assert!(
        reports
            .category_breakdown(alice.id, DateRange::all())
            .await?
            .is_empty()
    );
    assert_eq!(reports.summary(alice.id, DateRange::all()).await?.net, 0);

    Ok(())
}
