use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Cents, DateRange, Transaction, TransactionKind, TransactionId, YearMonth};

/// Net cash flow for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyNet {
    pub month: YearMonth,
    pub income: Cents,
    pub expense: Cents,
    pub net: Cents,
}

/// Balance after applying one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub transaction_id: TransactionId,
    pub balance: Cents,
}

/// Income and expense totals over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub income: Cents,
    pub expense: Cents,
    pub net: Cents,
}

/// Expense totals per category. Categories without expenses do not appear.
pub fn category_totals(transactions: &[Transaction]) -> BTreeMap<String, Cents> {
    let mut totals = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.is_expense()) {
        *totals.entry(tx.category.clone()).or_insert(0) += tx.amount_cents;
    }
    totals
}

/// `income - expense` per calendar month, oldest first.
///
/// Months run from the range start (or the earliest transaction) to the
/// range end (or the latest transaction); months with no activity are
/// reported as zero so chart axes stay continuous. Transactions outside
/// the range are ignored.
pub fn monthly_net(transactions: &[Transaction], range: DateRange) -> Vec<MonthlyNet> {
    let in_range: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| range.contains(t.date))
        .collect();

    let first = range
        .from
        .or_else(|| in_range.iter().map(|t| t.date).min());
    let last = range.to.or_else(|| in_range.iter().map(|t| t.date).max());
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };

    let mut months: BTreeMap<YearMonth, MonthlyNet> = YearMonth::of(first)
        .through(YearMonth::of(last))
        .into_iter()
        .map(|month| {
            (
                month,
                MonthlyNet {
                    month,
                    income: 0,
                    expense: 0,
                    net: 0,
                },
            )
        })
        .collect();

    for tx in in_range {
        if let Some(entry) = months.get_mut(&YearMonth::of(tx.date)) {
            match tx.kind {
                TransactionKind::Income => entry.income += tx.amount_cents,
                TransactionKind::Expense => entry.expense += tx.amount_cents,
            }
            entry.net += tx.signed_amount();
        }
    }

    months.into_values().collect()
}

/// Cumulative balance after each transaction, starting from `opening`.
///
/// Transactions are ordered by date and then by insertion sequence, so
/// entries sharing a date always accumulate in the same order.
pub fn running_balance(transactions: &[Transaction], opening: Cents) -> Vec<BalancePoint> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| (t.date, t.sequence));

    let mut balance = opening;
    ordered
        .into_iter()
        .map(|tx| {
            balance += tx.signed_amount();
            BalancePoint {
                date: tx.date,
                transaction_id: tx.id,
                balance,
            }
        })
        .collect()
}

pub fn totals(transactions: &[Transaction]) -> Totals {
    transactions.iter().fold(Totals::default(), |mut acc, tx| {
        match tx.kind {
            TransactionKind::Income => acc.income += tx.amount_cents,
            TransactionKind::Expense => acc.expense += tx.amount_cents,
        }
        acc.net += tx.signed_amount();
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTransaction;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tx(seq: i64, day: &str, kind: TransactionKind, category: &str, amount: Cents) -> Transaction {
        let mut t = Transaction::new(
            Uuid::nil(),
            NewTransaction {
                date: date(day),
                kind,
                category: category.to_string(),
                description: String::new(),
                amount_cents: amount,
            },
            Utc::now(),
        );
        t.sequence = seq;
        t
    }

    fn january() -> Vec<Transaction> {
        vec![
            tx(1, "2024-01-01", TransactionKind::Income, "Salary", 1000),
            tx(2, "2024-01-05", TransactionKind::Expense, "Food", 300),
            tx(3, "2024-01-10", TransactionKind::Expense, "Rent", 200),
        ]
    }

    #[test]
    fn test_monthly_net_single_month() {
        let report = monthly_net(&january(), DateRange::all());
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].month.to_string(), "2024-01");
        assert_eq!(report[0].net, 500);
        assert_eq!(report[0].income, 1000);
        assert_eq!(report[0].expense, 500);
    }

    #[test]
    fn test_monthly_net_fills_gaps() {
        let txs = vec![
            tx(1, "2024-01-15", TransactionKind::Income, "Salary", 100),
            tx(2, "2024-03-02", TransactionKind::Expense, "Food", 40),
        ];
        let report = monthly_net(&txs, DateRange::all());
        let nets: Vec<(String, Cents)> = report
            .iter()
            .map(|m| (m.month.to_string(), m.net))
            .collect();
        assert_eq!(
            nets,
            [
                ("2024-01".to_string(), 100),
                ("2024-02".to_string(), 0),
                ("2024-03".to_string(), -40)
            ]
        );
    }

    #[test]
    fn test_monthly_net_empty() {
        assert!(monthly_net(&[], DateRange::all()).is_empty());
    }

    #[test]
    fn test_running_balance() {
        let points = running_balance(&january(), 0);
        let balances: Vec<Cents> = points.iter().map(|p| p.balance).collect();
        assert_eq!(balances, [1000, 700, 500]);
    }

    #[test]
    fn test_running_balance_orders_same_day_by_sequence() {
        let txs = vec![
            tx(7, "2024-01-01", TransactionKind::Expense, "Food", 50),
            tx(3, "2024-01-01", TransactionKind::Income, "Salary", 200),
        ];
        let balances: Vec<Cents> = running_balance(&txs, 10).iter().map(|p| p.balance).collect();
        assert_eq!(balances, [210, 160]);
    }

    #[test]
    fn test_category_totals_only_expenses() {
        let mut txs = january();
        txs.push(tx(4, "2024-01-12", TransactionKind::Expense, "Food", 25));
        let totals = category_totals(&txs);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Food"], 325);
        assert_eq!(totals["Rent"], 200);
        assert!(!totals.contains_key("Salary"));
    }

    #[test]
    fn test_totals() {
        let t = totals(&january());
        assert_eq!(t.income, 1000);
        assert_eq!(t.expense, 500);
        assert_eq!(t.net, 500);
    }
}
