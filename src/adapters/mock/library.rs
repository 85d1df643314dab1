use crate::domain::{
    Book, BookId, BorrowId, BorrowStatus, BorrowingTransaction, DamageId, DamageRecord,
    FineExposure, Member, MemberId, MemberStatus, PaymentStatus, PenaltyId, Reservation,
    ReservationCode, ReservationId, ReservationStatus, ReturnId, ReturningTransaction,
    SuspensionPenalty,
};
use crate::ports::{
    BookQuery, BookRepository, CirculationStore, DamageEntry, DeleteOutcome, ExposureEntry,
    HoldOutcome, LoanRecord, MemberRepository, ReservationEntry, ReservationStore, Result,
    SaveOutcome, SuspensionStore,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LibraryState {
    books: HashMap<BookId, Book>,
    members: HashMap<MemberId, Member>,
    borrowings: HashMap<BorrowId, BorrowingTransaction>,
    returns: HashMap<ReturnId, ReturningTransaction>,
    damages: HashMap<DamageId, DamageRecord>,
    reservations: HashMap<ReservationId, Reservation>,
    penalties: HashMap<PenaltyId, SuspensionPenalty>,
}

impl LibraryState {
    fn book_title(&self, book_id: BookId) -> String {
        self.books
            .get(&book_id)
            .map(|b| b.title.clone())
            .unwrap_or_default()
    }

    fn member_name(&self, member_id: MemberId) -> String {
        self.members
            .get(&member_id)
            .map(|m| m.name.clone())
            .unwrap_or_default()
    }

    fn return_for(&self, borrow_id: BorrowId) -> Option<&ReturningTransaction> {
        self.returns.values().find(|r| r.borrow_id == borrow_id)
    }

    fn loan_record(&self, borrowing: &BorrowingTransaction) -> LoanRecord {
        LoanRecord {
            borrowing: borrowing.clone(),
            returning: self.return_for(borrowing.borrow_id).cloned(),
            book_title: self.book_title(borrowing.book_id),
            member_name: self.member_name(borrowing.member_id),
        }
    }

    fn damage_entry(&self, record: &DamageRecord) -> Option<DamageEntry> {
        let borrowing = self.borrowings.get(&record.borrow_id)?;
        Some(DamageEntry {
            record: record.clone(),
            member_id: borrowing.member_id,
            member_name: self.member_name(borrowing.member_id),
            book_title: self.book_title(borrowing.book_id),
        })
    }

    fn reservation_entry(&self, reservation: &Reservation) -> ReservationEntry {
        ReservationEntry {
            reservation: reservation.clone(),
            book_title: self.book_title(reservation.book_id),
            member_name: self.member_name(reservation.member_id),
        }
    }

    fn email_taken(&self, email: &str, except: MemberId) -> bool {
        self.members
            .values()
            .any(|m| m.member_id != except && m.email == email)
    }

    /// Unpaid late fines of a member as (return date, amount)
    fn unpaid_late_fines(&self, member_id: MemberId) -> Vec<(NaiveDate, Decimal)> {
        self.returns
            .values()
            .filter(|r| !r.payment_status.is_paid() && r.fine_amount > Decimal::ZERO)
            .filter(|r| {
                self.borrowings
                    .get(&r.borrow_id)
                    .is_some_and(|b| b.member_id == member_id)
            })
            .map(|r| (r.return_date, r.fine_amount))
            .collect()
    }

    /// Unpaid damage fines of a member as (damage date, amount)
    fn unpaid_damage_fines(&self, member_id: MemberId) -> Vec<(NaiveDate, Decimal)> {
        self.damages
            .values()
            .filter(|d| !d.payment_status.is_paid())
            .filter(|d| {
                self.borrowings
                    .get(&d.borrow_id)
                    .is_some_and(|b| b.member_id == member_id)
            })
            .map(|d| (d.damage_date, d.damage_fine))
            .collect()
    }

    fn remove_borrowings_where(&mut self, pred: impl Fn(&BorrowingTransaction) -> bool) {
        let doomed: Vec<BorrowId> = self
            .borrowings
            .values()
            .filter(|b| pred(b))
            .map(|b| b.borrow_id)
            .collect();
        for borrow_id in doomed {
            self.borrowings.remove(&borrow_id);
            self.returns.retain(|_, r| r.borrow_id != borrow_id);
            self.damages.retain(|_, d| d.borrow_id != borrow_id);
        }
    }
}

fn sum_dated(fines: &[(NaiveDate, Decimal)], cutoff: NaiveDate) -> Decimal {
    fines
        .iter()
        .filter(|(date, _)| *date <= cutoff)
        .map(|(_, amount)| *amount)
        .sum()
}

/// In-memory implementation of every persistence port.
///
/// All stores share one lock, so each guarded multi-row write is atomic in
/// the same way a database transaction is.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    state: Mutex<LibraryState>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds a borrowing directly, skipping stock bookkeeping
    pub fn seed_borrowing(&self, borrowing: BorrowingTransaction) {
        self.state()
            .borrowings
            .insert(borrowing.borrow_id, borrowing);
    }

    /// Seeds a return directly, skipping stock bookkeeping
    pub fn seed_returning(&self, returning: ReturningTransaction) {
        self.state().returns.insert(returning.return_id, returning);
    }
}

#[async_trait]
impl BookRepository for InMemoryLibrary {
    async fn insert(&self, book: &Book) -> Result<()> {
        self.state().books.insert(book.book_id, book.clone());
        Ok(())
    }

    async fn update(&self, book: &Book) -> Result<bool> {
        let mut state = self.state();
        let Some(current) = state.books.get_mut(&book.book_id) else {
            return Ok(false);
        };
        if book.stock < current.reserved_stock {
            return Ok(false);
        }
        *current = Book {
            reserved_stock: current.reserved_stock,
            created_at: current.created_at,
            ..book.clone()
        };
        Ok(true)
    }

    async fn delete(&self, book_id: BookId) -> Result<DeleteOutcome> {
        let mut state = self.state();
        if !state.books.contains_key(&book_id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let lent = state
            .borrowings
            .values()
            .any(|b| b.book_id == book_id && b.status == BorrowStatus::Borrowed);
        let held = state
            .reservations
            .values()
            .any(|r| r.book_id == book_id && r.status.is_pending());
        if lent || held {
            return Ok(DeleteOutcome::InUse);
        }

        state.books.remove(&book_id);
        state.remove_borrowings_where(|b| b.book_id == book_id);
        state.reservations.retain(|_, r| r.book_id != book_id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.state().books.get(&book_id).cloned())
    }

    async fn search(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let text = query.text.as_deref().map(str::to_lowercase);
        let mut books: Vec<Book> = self
            .state()
            .books
            .values()
            .filter(|b| {
                text.as_deref().is_none_or(|t| {
                    b.title.to_lowercase().contains(t) || b.author.to_lowercase().contains(t)
                })
            })
            .filter(|b| query.category.as_deref().is_none_or(|c| b.category == c))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let categories: BTreeSet<String> = self
            .state()
            .books
            .values()
            .map(|b| b.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }
}

#[async_trait]
impl MemberRepository for InMemoryLibrary {
    async fn insert(&self, member: &Member) -> Result<SaveOutcome> {
        let mut state = self.state();
        if state.email_taken(&member.email, member.member_id) {
            return Ok(SaveOutcome::DuplicateEmail);
        }
        state.members.insert(member.member_id, member.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn update(&self, member: &Member) -> Result<SaveOutcome> {
        let mut state = self.state();
        if !state.members.contains_key(&member.member_id) {
            return Ok(SaveOutcome::NotFound);
        }
        if state.email_taken(&member.email, member.member_id) {
            return Ok(SaveOutcome::DuplicateEmail);
        }
        state.members.insert(member.member_id, member.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn delete(&self, member_id: MemberId) -> Result<DeleteOutcome> {
        let mut state = self.state();
        if !state.members.contains_key(&member_id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let lent = state
            .borrowings
            .values()
            .any(|b| b.member_id == member_id && b.status == BorrowStatus::Borrowed);
        let held = state
            .reservations
            .values()
            .any(|r| r.member_id == member_id && r.status.is_pending());
        if lent || held {
            return Ok(DeleteOutcome::InUse);
        }

        state.members.remove(&member_id);
        state.remove_borrowings_where(|b| b.member_id == member_id);
        state.reservations.retain(|_, r| r.member_id != member_id);
        state.penalties.retain(|_, p| p.member_id != member_id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn get_by_id(&self, member_id: MemberId) -> Result<Option<Member>> {
        Ok(self.state().members.get(&member_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let mut members: Vec<Member> = self.state().members.values().cloned().collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }
}

#[async_trait]
impl CirculationStore for InMemoryLibrary {
    async fn open_borrowing(&self, borrowing: &BorrowingTransaction) -> Result<bool> {
        let mut state = self.state();
        let member_active = state
            .members
            .get(&borrowing.member_id)
            .is_some_and(|m| m.status.is_active());
        let Some(book) = state.books.get_mut(&borrowing.book_id) else {
            return Ok(false);
        };
        if !member_active || !book.is_available() {
            return Ok(false);
        }
        book.stock -= 1;
        state
            .borrowings
            .insert(borrowing.borrow_id, borrowing.clone());
        Ok(true)
    }

    async fn close_borrowing(
        &self,
        borrowing: &BorrowingTransaction,
        returning: &ReturningTransaction,
    ) -> Result<bool> {
        let mut state = self.state();
        let Some(current) = state.borrowings.get_mut(&borrowing.borrow_id) else {
            return Ok(false);
        };
        if current.status != BorrowStatus::Borrowed {
            return Ok(false);
        }
        current.status = BorrowStatus::Returned;
        if let Some(book) = state.books.get_mut(&borrowing.book_id) {
            book.stock += 1;
        }
        state.returns.insert(returning.return_id, returning.clone());
        Ok(true)
    }

    async fn get_borrowing(&self, borrow_id: BorrowId) -> Result<Option<BorrowingTransaction>> {
        Ok(self.state().borrowings.get(&borrow_id).cloned())
    }

    async fn get_returning_for(&self, borrow_id: BorrowId) -> Result<Option<ReturningTransaction>> {
        Ok(self.state().return_for(borrow_id).cloned())
    }

    async fn get_returning(
        &self,
        return_id: ReturnId,
    ) -> Result<Option<(ReturningTransaction, MemberId)>> {
        let state = self.state();
        Ok(state.returns.get(&return_id).and_then(|r| {
            state
                .borrowings
                .get(&r.borrow_id)
                .map(|b| (r.clone(), b.member_id))
        }))
    }

    async fn record_damage(&self, record: &DamageRecord) -> Result<bool> {
        let mut state = self.state();
        let Some(returning) = state
            .returns
            .values_mut()
            .find(|r| r.borrow_id == record.borrow_id)
        else {
            return Ok(false);
        };
        if returning.damage_recorded {
            return Ok(false);
        }
        returning.damage_recorded = true;
        state.damages.insert(record.damage_id, record.clone());
        Ok(true)
    }

    async fn get_damage(&self, damage_id: DamageId) -> Result<Option<(DamageRecord, MemberId)>> {
        let state = self.state();
        Ok(state.damages.get(&damage_id).and_then(|d| {
            state
                .borrowings
                .get(&d.borrow_id)
                .map(|b| (d.clone(), b.member_id))
        }))
    }

    async fn settle_late_fine(&self, returning: &ReturningTransaction) -> Result<bool> {
        let mut state = self.state();
        match state.returns.get_mut(&returning.return_id) {
            Some(current) if !current.payment_status.is_paid() => {
                current.payment_status = returning.payment_status;
                current.payment_method = returning.payment_method;
                current.payment_date = returning.payment_date;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn settle_damage_fine(&self, record: &DamageRecord) -> Result<bool> {
        let mut state = self.state();
        match state.damages.get_mut(&record.damage_id) {
            Some(current) if !current.payment_status.is_paid() => {
                current.payment_status = record.payment_status;
                current.payment_method = record.payment_method;
                current.payment_date = record.payment_date;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn member_loans(&self, member_id: MemberId) -> Result<Vec<LoanRecord>> {
        let state = self.state();
        let mut loans: Vec<LoanRecord> = state
            .borrowings
            .values()
            .filter(|b| b.member_id == member_id)
            .map(|b| state.loan_record(b))
            .collect();
        loans.sort_by(|a, b| b.borrowing.borrow_date.cmp(&a.borrowing.borrow_date));
        Ok(loans)
    }

    async fn member_damages(&self, member_id: MemberId) -> Result<Vec<DamageEntry>> {
        let state = self.state();
        let mut entries: Vec<DamageEntry> = state
            .damages
            .values()
            .filter_map(|d| state.damage_entry(d))
            .filter(|e| e.member_id == member_id)
            .collect();
        entries.sort_by(|a, b| b.record.damage_date.cmp(&a.record.damage_date));
        Ok(entries)
    }

    async fn loans_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<BorrowStatus>,
    ) -> Result<Vec<LoanRecord>> {
        let state = self.state();
        let mut loans: Vec<LoanRecord> = state
            .borrowings
            .values()
            .filter(|b| b.borrow_date >= from && b.borrow_date <= to)
            .filter(|b| status.is_none_or(|s| b.status == s))
            .map(|b| state.loan_record(b))
            .collect();
        loans.sort_by(|a, b| b.borrowing.borrow_date.cmp(&a.borrowing.borrow_date));
        Ok(loans)
    }

    async fn damage_records(
        &self,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<DamageEntry>> {
        let state = self.state();
        let mut entries: Vec<DamageEntry> = state
            .damages
            .values()
            .filter(|d| payment_status.is_none_or(|s| d.payment_status == s))
            .filter_map(|d| state.damage_entry(d))
            .collect();
        entries.sort_by(|a, b| b.record.damage_date.cmp(&a.record.damage_date));
        Ok(entries)
    }
}

#[async_trait]
impl ReservationStore for InMemoryLibrary {
    async fn hold(&self, reservation: &Reservation) -> Result<HoldOutcome> {
        let mut state = self.state();
        if state
            .reservations
            .values()
            .any(|r| r.code == reservation.code)
        {
            return Ok(HoldOutcome::CodeTaken);
        }
        if state.reservations.values().any(|r| {
            r.status.is_pending()
                && r.member_id == reservation.member_id
                && r.book_id == reservation.book_id
        }) {
            return Ok(HoldOutcome::DuplicatePending);
        }
        let Some(book) = state.books.get_mut(&reservation.book_id) else {
            return Ok(HoldOutcome::StockExhausted);
        };
        if !book.is_available() {
            return Ok(HoldOutcome::StockExhausted);
        }
        book.reserved_stock += 1;
        state
            .reservations
            .insert(reservation.reservation_id, reservation.clone());
        Ok(HoldOutcome::Held)
    }

    async fn has_pending(&self, member_id: MemberId, book_id: BookId) -> Result<bool> {
        Ok(self.state().reservations.values().any(|r| {
            r.status.is_pending() && r.member_id == member_id && r.book_id == book_id
        }))
    }

    async fn code_exists(&self, code: &ReservationCode) -> Result<bool> {
        Ok(self.state().reservations.values().any(|r| &r.code == code))
    }

    async fn get_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.state().reservations.get(&reservation_id).cloned())
    }

    async fn get_by_code(&self, code: &ReservationCode) -> Result<Option<Reservation>> {
        Ok(self
            .state()
            .reservations
            .values()
            .find(|r| &r.code == code)
            .cloned())
    }

    async fn collect(
        &self,
        collected: &Reservation,
        borrowing: &BorrowingTransaction,
    ) -> Result<bool> {
        let mut state = self.state();
        match state.reservations.get_mut(&collected.reservation_id) {
            Some(current) if current.status.is_pending() => {
                *current = collected.clone();
            }
            _ => return Ok(false),
        }
        if let Some(book) = state.books.get_mut(&collected.book_id) {
            book.stock -= 1;
            book.reserved_stock -= 1;
        }
        state
            .borrowings
            .insert(borrowing.borrow_id, borrowing.clone());
        Ok(true)
    }

    async fn release(&self, reservation: &Reservation) -> Result<bool> {
        let mut state = self.state();
        match state.reservations.get_mut(&reservation.reservation_id) {
            Some(current) if current.status.is_pending() => {
                *current = reservation.clone();
            }
            _ => return Ok(false),
        }
        if let Some(book) = state.books.get_mut(&reservation.book_id) {
            book.reserved_stock = (book.reserved_stock - 1).max(0);
        }
        Ok(true)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let mut overdue: Vec<Reservation> = self
            .state()
            .reservations
            .values()
            .filter(|r| r.is_overdue(now))
            .cloned()
            .collect();
        overdue.sort_by_key(|r| r.pickup_deadline);
        Ok(overdue)
    }

    async fn list_pending(&self) -> Result<Vec<ReservationEntry>> {
        let state = self.state();
        let mut entries: Vec<ReservationEntry> = state
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending)
            .map(|r| state.reservation_entry(r))
            .collect();
        entries.sort_by_key(|e| e.reservation.pickup_deadline);
        Ok(entries)
    }

    async fn list_for_member(&self, member_id: MemberId) -> Result<Vec<ReservationEntry>> {
        let state = self.state();
        let mut entries: Vec<ReservationEntry> = state
            .reservations
            .values()
            .filter(|r| r.member_id == member_id)
            .map(|r| state.reservation_entry(r))
            .collect();
        entries.sort_by(|a, b| b.reservation.reserved_at.cmp(&a.reservation.reserved_at));
        Ok(entries)
    }
}

#[async_trait]
impl SuspensionStore for InMemoryLibrary {
    async fn find_candidates(&self, cutoff: NaiveDate) -> Result<Vec<FineExposure>> {
        let state = self.state();
        Ok(state
            .members
            .values()
            .filter(|m| m.status.is_active())
            .map(|m| FineExposure {
                member_id: m.member_id,
                member_status: m.status,
                late_fines: sum_dated(&state.unpaid_late_fines(m.member_id), cutoff),
                damage_fines: sum_dated(&state.unpaid_damage_fines(m.member_id), cutoff),
            })
            .filter(|e| e.total() > Decimal::ZERO)
            .collect())
    }

    async fn outstanding_exposures(&self) -> Result<Vec<ExposureEntry>> {
        let state = self.state();
        let mut entries: Vec<ExposureEntry> = state
            .members
            .values()
            .filter_map(|m| {
                let late = state.unpaid_late_fines(m.member_id);
                let damage = state.unpaid_damage_fines(m.member_id);
                let oldest_unpaid = late.iter().chain(damage.iter()).map(|(d, _)| *d).min()?;
                Some(ExposureEntry {
                    exposure: FineExposure {
                        member_id: m.member_id,
                        member_status: m.status,
                        late_fines: late.iter().map(|(_, a)| *a).sum(),
                        damage_fines: damage.iter().map(|(_, a)| *a).sum(),
                    },
                    member_name: m.name.clone(),
                    member_email: m.email.clone(),
                    oldest_unpaid,
                })
            })
            .collect();
        entries.sort_by_key(|e| e.oldest_unpaid);
        Ok(entries)
    }

    async fn suspend(&self, penalty: &SuspensionPenalty) -> Result<bool> {
        let mut state = self.state();
        match state.members.get_mut(&penalty.member_id) {
            Some(member) if member.status.is_active() => {
                member.status = MemberStatus::Suspended;
                member.updated_at = penalty.suspension_date;
            }
            _ => return Ok(false),
        }
        state.penalties.insert(penalty.penalty_id, penalty.clone());
        Ok(true)
    }

    async fn get_penalty(&self, penalty_id: PenaltyId) -> Result<Option<SuspensionPenalty>> {
        Ok(self.state().penalties.get(&penalty_id).cloned())
    }

    async fn penalties_for(&self, member_id: MemberId) -> Result<Vec<SuspensionPenalty>> {
        let mut penalties: Vec<SuspensionPenalty> = self
            .state()
            .penalties
            .values()
            .filter(|p| p.member_id == member_id)
            .cloned()
            .collect();
        penalties.sort_by(|a, b| b.suspension_date.cmp(&a.suspension_date));
        Ok(penalties)
    }

    async fn settle_penalty(&self, penalty: &SuspensionPenalty) -> Result<bool> {
        let mut state = self.state();
        match state.penalties.get_mut(&penalty.penalty_id) {
            Some(current) if !current.payment_status.is_paid() => {
                *current = penalty.clone();
            }
            _ => return Ok(false),
        }
        if let Some(member) = state.members.get_mut(&penalty.member_id) {
            member.status = MemberStatus::Active;
            if let Some(at) = penalty.unsuspension_date {
                member.updated_at = at;
            }
        }
        Ok(true)
    }
}
