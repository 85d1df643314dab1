use crate::domain::{BorrowStatus, DamageCategory, PaymentStatus, Principal};
use crate::ports::{DamageEntry, LoanRecord};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{LibraryError, Result, ServiceDependencies};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BorrowingTotals {
    pub total: usize,
    pub borrowed: usize,
    pub returned: usize,
    /// Late fines produced by the returns in range, paid or not
    pub total_fines: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BorrowingReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub status: Option<BorrowStatus>,
    pub loans: Vec<LoanRecord>,
    pub totals: BorrowingTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: DamageCategory,
    pub name: &'static str,
    pub count: usize,
    pub total_fine: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DamageReport {
    pub payment_status: Option<PaymentStatus>,
    pub records: Vec<DamageEntry>,
    pub by_category: Vec<CategoryStats>,
    pub total_fines: Decimal,
    pub unpaid_fines: Decimal,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn borrowing_totals(loans: &[LoanRecord]) -> BorrowingTotals {
    loans.iter().fold(BorrowingTotals::default(), |mut totals, loan| {
        totals.total += 1;
        match loan.borrowing.status {
            BorrowStatus::Borrowed => totals.borrowed += 1,
            BorrowStatus::Returned => totals.returned += 1,
        }
        if let Some(returning) = &loan.returning {
            totals.total_fines += returning.fine_amount;
        }
        totals
    })
}

/// Every category appears, including ones with no records
fn category_stats(records: &[DamageEntry]) -> Vec<CategoryStats> {
    DamageCategory::ALL
        .iter()
        .map(|&category| {
            let matching = records.iter().filter(|e| e.record.category == category);
            CategoryStats {
                category,
                name: category.name(),
                count: matching.clone().count(),
                total_fine: matching.map(|e| e.record.damage_fine).sum(),
            }
        })
        .collect()
}

/// Borrowings made between two dates inclusive (staff only).
///
/// The range defaults to the first of the current month through today.
pub async fn borrowing_report(
    deps: &ServiceDependencies,
    principal: &Principal,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    status: Option<BorrowStatus>,
) -> Result<BorrowingReport> {
    principal.require_staff()?;

    let today = deps.clock.today();
    let from = from.unwrap_or_else(|| first_of_month(today));
    let to = to.unwrap_or(today);
    if from > to {
        return Err(LibraryError::InvalidInput(
            "report start date must not be after its end date".to_string(),
        ));
    }

    let loans = deps
        .circulation
        .loans_between(from, to, status)
        .await
        .map_err(LibraryError::Storage)?;
    let totals = borrowing_totals(&loans);

    Ok(BorrowingReport {
        from,
        to,
        status,
        loans,
        totals,
    })
}

/// Damage records with per-category statistics (staff only)
pub async fn damage_report(
    deps: &ServiceDependencies,
    principal: &Principal,
    payment_status: Option<PaymentStatus>,
) -> Result<DamageReport> {
    principal.require_staff()?;

    let records = deps
        .circulation
        .damage_records(payment_status)
        .await
        .map_err(LibraryError::Storage)?;

    let total_fines = records.iter().map(|e| e.record.damage_fine).sum();
    let unpaid_fines = records
        .iter()
        .filter(|e| !e.record.payment_status.is_paid())
        .map(|e| e.record.damage_fine)
        .sum();

    Ok(DamageReport {
        payment_status,
        by_category: category_stats(&records),
        records,
        total_fines,
        unpaid_fines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        BookId, BorrowId, BorrowingTransaction, DamageId, DamageRecord, MemberId, ReturnId,
        ReturningTransaction, StaffId,
    };
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan(status: BorrowStatus, fine: Option<Decimal>) -> LoanRecord {
        let borrow_id = BorrowId::new();
        LoanRecord {
            borrowing: BorrowingTransaction {
                borrow_id,
                member_id: MemberId::new(),
                book_id: BookId::new(),
                reservation_id: None,
                borrow_date: date(2024, 1, 1),
                due_date: date(2024, 1, 15),
                status,
            },
            returning: fine.map(|fine_amount| ReturningTransaction {
                return_id: ReturnId::new(),
                borrow_id,
                return_date: date(2024, 1, 20),
                late_days: 5,
                fine_amount,
                payment_status: PaymentStatus::Unpaid,
                payment_method: None,
                payment_date: None,
                damage_recorded: false,
            }),
            book_title: "Dune".to_string(),
            member_name: "Ana".to_string(),
        }
    }

    fn damage(category: DamageCategory, fine: Decimal) -> DamageEntry {
        DamageEntry {
            record: DamageRecord {
                damage_id: DamageId::new(),
                borrow_id: BorrowId::new(),
                category,
                notes: "spine cracked".to_string(),
                damage_date: date(2024, 1, 20),
                book_value: dec!(100000),
                damage_fine: fine,
                payment_status: PaymentStatus::Unpaid,
                payment_method: None,
                payment_date: None,
                reported_by: StaffId::new(),
            },
            member_id: MemberId::new(),
            member_name: "Ana".to_string(),
            book_title: "Dune".to_string(),
        }
    }

    #[test]
    fn test_first_of_month() {
        assert_eq!(first_of_month(date(2024, 2, 29)), date(2024, 2, 1));
    }

    #[test]
    fn test_borrowing_totals_count_statuses_and_fines() {
        let loans = vec![
            loan(BorrowStatus::Borrowed, None),
            loan(BorrowStatus::Returned, Some(dec!(25000))),
            loan(BorrowStatus::Returned, Some(dec!(0))),
        ];
        let totals = borrowing_totals(&loans);
        assert_eq!(totals.total, 3);
        assert_eq!(totals.borrowed, 1);
        assert_eq!(totals.returned, 2);
        assert_eq!(totals.total_fines, dec!(25000));
    }

    #[test]
    fn test_category_stats_cover_every_category() {
        let records = vec![
            damage(DamageCategory::TornPages, dec!(20000)),
            damage(DamageCategory::TornPages, dec!(10000)),
            damage(DamageCategory::Lost, dec!(50000)),
        ];
        let stats = category_stats(&records);
        assert_eq!(stats.len(), DamageCategory::ALL.len());

        let torn = stats
            .iter()
            .find(|s| s.category == DamageCategory::TornPages)
            .unwrap();
        assert_eq!(torn.count, 2);
        assert_eq!(torn.total_fine, dec!(30000));

        let minor = stats
            .iter()
            .find(|s| s.category == DamageCategory::MinorWear)
            .unwrap();
        assert_eq!(minor.count, 0);
        assert_eq!(minor.total_fine, Decimal::ZERO);
    }
}
