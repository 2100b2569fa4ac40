use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use tally_domain::{
    Account, AccountKind, Budget, Frequency, LedgerBook, PeriodKey, PostEvent, RecurringRule,
    ThresholdSet, Transaction, TransactionKind, UserId,
};

use crate::{
    AlertService, Clock, EngineError, LedgerStore, MemoryStore, PostingService, ReconcileService,
    StoreError, TransferRequest, TransferService, WriteBatch, WriteOp, MAX_CATCHUP_POSTINGS,
};

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn owner() -> UserId {
    Uuid::new_v4()
}

fn account_for(book: &mut LedgerBook, owner: UserId, starting_balance: f64) -> Uuid {
    let account = Account::new(
        "Checking",
        AccountKind::Checking,
        starting_balance,
        owner,
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    );
    let id = account.id;
    book.accounts.push(account);
    id
}

#[test]
fn advance_posts_one_occurrence_and_advances_rule() {
    let mut book = LedgerBook::new();
    let rule = RecurringRule::new(
        "Gym",
        50.0,
        TransactionKind::Expense,
        Frequency::Monthly,
        date(2026, 3, 10),
    );
    let rule_id = rule.id;
    book.rules.push(rule);
    let mut store = MemoryStore::new(book);

    let outcome = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();

    assert_eq!(outcome.posted.len(), 1);
    assert_eq!(outcome.posted[0].due_date, date(2026, 3, 10));
    let book = store.book();
    assert_eq!(book.transactions.len(), 1);
    assert!(book.transactions[0].is_recurring);
    assert_eq!(book.transactions[0].rule_id, Some(rule_id));
    assert_eq!(book.post_events.len(), 1);
    assert_eq!(book.rule(rule_id).unwrap().next_due_date, date(2026, 4, 10));
}

#[test]
fn advance_catches_up_missed_occurrences_oldest_first() {
    let mut book = LedgerBook::new();
    book.rules.push(RecurringRule::new(
        "Coffee",
        4.0,
        TransactionKind::Expense,
        Frequency::Weekly,
        date(2026, 3, 1),
    ));
    let mut store = MemoryStore::new(book);

    let outcome = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();

    let dues: Vec<NaiveDate> = outcome.posted.iter().map(|p| p.due_date).collect();
    assert_eq!(dues, vec![date(2026, 3, 1), date(2026, 3, 8), date(2026, 3, 15)]);
}

#[test]
fn advance_is_idempotent_for_the_same_as_of() {
    let mut book = LedgerBook::new();
    book.rules.push(RecurringRule::new(
        "Rent",
        1200.0,
        TransactionKind::Expense,
        Frequency::Monthly,
        date(2026, 2, 1),
    ));
    let mut store = MemoryStore::new(book);

    let first = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();
    let second = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();

    assert_eq!(first.posted.len(), 2);
    assert!(second.posted.is_empty());
    assert_eq!(store.book().post_events.len(), 2);
}

#[test]
fn remaining_occurrences_count_down_and_deactivate() {
    let mut book = LedgerBook::new();
    let rule = RecurringRule::new(
        "Installment",
        99.0,
        TransactionKind::Expense,
        Frequency::Daily,
        date(2026, 3, 13),
    )
    .limited_to(2);
    let rule_id = rule.id;
    book.rules.push(rule);
    let mut store = MemoryStore::new(book);

    let outcome = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();

    assert_eq!(outcome.posted.len(), 2);
    let stored = store.book().rule(rule_id).unwrap();
    assert!(!stored.active);
    assert_eq!(stored.remaining_occurrences, Some(0));
}

#[test]
fn catch_up_is_capped_per_run_and_resumes_next_tick() {
    let as_of = date(2026, 3, 15);
    let gap_days: i64 = 1100;
    let mut book = LedgerBook::new();
    let rule = RecurringRule::new(
        "Ancient",
        1.0,
        TransactionKind::Expense,
        Frequency::Daily,
        as_of - Duration::days(gap_days),
    );
    let rule_id = rule.id;
    book.rules.push(rule);
    let mut store = MemoryStore::new(book);

    let first = PostingService::advance(&mut store, as_of, &clock()).unwrap();
    assert_eq!(first.posted.len(), MAX_CATCHUP_POSTINGS);
    let stored = store.book().rule(rule_id).unwrap();
    assert!(stored.active);
    assert!(stored.next_due_date <= as_of);

    // Next tick picks up where the cap left off and finishes the backlog.
    let second = PostingService::advance(&mut store, as_of, &clock()).unwrap();
    let total = gap_days as usize + 1;
    assert_eq!(second.posted.len(), total - MAX_CATCHUP_POSTINGS);
    assert_eq!(store.book().post_events.len(), total);
    assert!(store.book().rule(rule_id).unwrap().next_due_date > as_of);
}

#[test]
fn rule_past_end_date_deactivates_without_posting() {
    let mut book = LedgerBook::new();
    let mut rule = RecurringRule::new(
        "Expired",
        10.0,
        TransactionKind::Expense,
        Frequency::Daily,
        date(2026, 3, 10),
    );
    rule.end_date = Some(date(2026, 3, 1));
    let rule_id = rule.id;
    book.rules.push(rule);
    let mut store = MemoryStore::new(book);

    let outcome = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();

    assert!(outcome.posted.is_empty());
    assert!(store.book().transactions.is_empty());
    assert!(!store.book().rule(rule_id).unwrap().active);
}

#[test]
fn advance_skips_rule_with_preexisting_post_event() {
    let mut book = LedgerBook::new();
    let rule = RecurringRule::new(
        "Ghost",
        5.0,
        TransactionKind::Expense,
        Frequency::Daily,
        date(2026, 3, 15),
    );
    book.post_events.push(PostEvent::new(
        rule.id,
        Uuid::new_v4(),
        date(2026, 3, 15),
        clock().now(),
    ));
    let rule_id = rule.id;
    book.rules.push(rule);
    let mut store = MemoryStore::new(book);

    let outcome = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();

    // The violating rule aborts without posting; its schedule is untouched.
    assert!(outcome.posted.is_empty());
    assert_eq!(store.book().rule(rule_id).unwrap().next_due_date, date(2026, 3, 15));
}

#[test]
fn expense_posting_triggers_budget_alert() {
    let mut book = LedgerBook::new();
    let category_id = Uuid::new_v4();
    book.rules.push(
        RecurringRule::new(
            "Groceries",
            80.0,
            TransactionKind::Expense,
            Frequency::Monthly,
            date(2026, 3, 10),
        )
        .with_category(category_id),
    );
    book.budgets.push(
        Budget::new(category_id, PeriodKey::new(2026, 3).unwrap(), 100.0)
            .with_thresholds(ThresholdSet::parse("50,75,90")),
    );
    let mut store = MemoryStore::new(book);

    let outcome = PostingService::advance(&mut store, date(2026, 3, 15), &clock()).unwrap();

    let thresholds: Vec<u8> = outcome.alerts.iter().map(|a| a.threshold).collect();
    assert_eq!(thresholds, vec![50, 75]);
}

#[test]
fn validate_rule_rejects_bad_definitions() {
    let good = RecurringRule::new(
        "Ok",
        10.0,
        TransactionKind::Income,
        Frequency::Weekly,
        date(2026, 1, 1),
    );
    assert!(PostingService::validate_rule(&good).is_ok());

    let mut blank = good.clone();
    blank.title = "  ".into();
    assert!(matches!(
        PostingService::validate_rule(&blank),
        Err(EngineError::Validation(_))
    ));

    let mut negative = good.clone();
    negative.amount = -1.0;
    assert!(PostingService::validate_rule(&negative).is_err());

    let mut exhausted = good;
    exhausted.remaining_occurrences = Some(0);
    assert!(PostingService::validate_rule(&exhausted).is_err());
}

#[test]
fn evaluate_ignores_transfers_and_other_periods() {
    let mut book = LedgerBook::new();
    let category_id = Uuid::new_v4();
    let budget = Budget::new(category_id, PeriodKey::new(2026, 3).unwrap(), 100.0);

    let spend = Transaction::new("Lunch", 40.0, TransactionKind::Expense, date(2026, 3, 2))
        .with_category(category_id);
    let mut transfer_leg = Transaction::new(
        "Shuffle",
        500.0,
        TransactionKind::Expense,
        date(2026, 3, 3),
    )
    .with_category(category_id);
    transfer_leg.is_transfer = true;
    transfer_leg.transfer_group = Some(Uuid::new_v4());
    let last_month = Transaction::new("Old", 90.0, TransactionKind::Expense, date(2026, 2, 20))
        .with_category(category_id);
    book.transactions.extend([spend, transfer_leg, last_month]);
    book.budgets.push(budget.clone());
    let mut store = MemoryStore::new(book);

    // 40% used: the transfer leg and last month's spend do not count.
    let created = AlertService::evaluate(&mut store, &budget, None, &clock()).unwrap();
    assert!(created.is_empty());
}

#[test]
fn evaluate_returns_empty_for_non_positive_budget() {
    let budget = Budget::new(Uuid::new_v4(), PeriodKey::new(2026, 3).unwrap(), 0.0);
    let mut store = MemoryStore::new(LedgerBook::new());
    let created = AlertService::evaluate(&mut store, &budget, None, &clock()).unwrap();
    assert!(created.is_empty());
}

#[test]
fn evaluate_never_duplicates_a_threshold_crossing() {
    let mut book = LedgerBook::new();
    let category_id = Uuid::new_v4();
    let budget = Budget::new(category_id, PeriodKey::new(2026, 3).unwrap(), 100.0)
        .with_thresholds(ThresholdSet::parse("50,75"));
    book.budgets.push(budget.clone());
    book.transactions.push(
        Transaction::new("Spend", 60.0, TransactionKind::Expense, date(2026, 3, 5))
            .with_category(category_id),
    );
    let mut store = MemoryStore::new(book);

    let first = AlertService::evaluate(&mut store, &budget, None, &clock()).unwrap();
    let again = AlertService::evaluate(&mut store, &budget, None, &clock()).unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].threshold, 50);
    assert_eq!(first[0].percent_used, 60.0);
    assert!(again.is_empty());
    assert_eq!(store.book().alerts.len(), 1);
}

#[test]
fn alert_feed_filters_and_counts_unread() {
    let user = owner();
    let mut book = LedgerBook::new();
    let category_id = Uuid::new_v4();
    let budget = Budget::new(category_id, PeriodKey::new(2026, 3).unwrap(), 10.0);
    book.budgets.push(budget.clone());
    book.transactions.push(
        Transaction::new("Blowout", 100.0, TransactionKind::Expense, date(2026, 3, 1))
            .with_category(category_id),
    );
    let mut store = MemoryStore::new(book);
    let created = AlertService::evaluate(&mut store, &budget, Some(user), &clock()).unwrap();
    assert_eq!(created.len(), 4);

    let feed = AlertService::feed(&store, user, true, 2).unwrap();
    assert_eq!(feed.alerts.len(), 2);
    assert_eq!(feed.unread_count, 4);

    AlertService::mark_read(&mut store, user, created[0].id).unwrap();
    let feed = AlertService::feed(&store, user, true, 10).unwrap();
    assert_eq!(feed.unread_count, 3);

    AlertService::mark_all_read(&mut store, user).unwrap();
    let feed = AlertService::feed(&store, user, true, 10).unwrap();
    assert!(feed.alerts.is_empty());
    assert_eq!(feed.unread_count, 0);

    let stranger = owner();
    assert!(matches!(
        AlertService::mark_read(&mut store, stranger, created[1].id),
        Err(EngineError::AlertNotFound(_))
    ));
}

#[test]
fn transfer_rejects_invalid_requests_before_any_write() {
    let user = owner();
    let mut book = LedgerBook::new();
    let a = account_for(&mut book, user, 0.0);
    let b = account_for(&mut book, user, 0.0);
    let foreign = account_for(&mut book, owner(), 0.0);
    let mut store = MemoryStore::new(book);

    let base = TransferRequest {
        from_account: a,
        to_account: b,
        amount: 25.0,
        date: date(2026, 3, 15),
        title: "Move".into(),
    };

    let mut same = base.clone();
    same.to_account = a;
    assert!(matches!(
        TransferService::create(&mut store, user, same),
        Err(EngineError::Validation(_))
    ));

    let mut zero = base.clone();
    zero.amount = 0.0;
    assert!(TransferService::create(&mut store, user, zero).is_err());

    let mut unowned = base;
    unowned.to_account = foreign;
    assert!(matches!(
        TransferService::create(&mut store, user, unowned),
        Err(EngineError::AccountNotFound(_))
    ));

    assert!(store.book().transactions.is_empty());
}

#[test]
fn transfer_creates_two_cleared_balanced_legs() {
    let user = owner();
    let mut book = LedgerBook::new();
    let a = account_for(&mut book, user, 0.0);
    let b = account_for(&mut book, user, 0.0);
    let mut store = MemoryStore::new(book);

    let result = TransferService::create(
        &mut store,
        user,
        TransferRequest {
            from_account: a,
            to_account: b,
            amount: 150.0,
            date: date(2026, 3, 15),
            title: String::new(),
        },
    )
    .unwrap();

    let legs = store.book().transfer_legs(result.transfer_group);
    assert_eq!(legs.len(), 2);
    assert!(legs.iter().all(|leg| leg.is_transfer && leg.is_cleared));
    assert_eq!(result.outgoing.kind, TransactionKind::Expense);
    assert_eq!(result.incoming.kind, TransactionKind::Income);
    assert_eq!(result.outgoing.amount, result.incoming.amount);
    assert_eq!(result.outgoing.title, "Transfer");

    let records = TransferService::list(&store, user, 10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].from_account, a);
    assert_eq!(records[0].to_account, b);
}

#[test]
fn commit_rejects_single_leg_transfer_batches() {
    let mut store = MemoryStore::new(LedgerBook::new());
    let leg = Transaction::transfer_leg(
        "Half",
        40.0,
        TransactionKind::Expense,
        date(2026, 3, 1),
        Uuid::new_v4(),
        Uuid::new_v4(),
    );

    let err = store
        .commit(WriteBatch::new().with(WriteOp::InsertTransaction(leg)))
        .unwrap_err();
    assert!(matches!(err, StoreError::UnbalancedTransfer(_)));
    assert!(store.book().transactions.is_empty());
}

#[test]
fn failed_batch_leaves_the_book_untouched() {
    let mut book = LedgerBook::new();
    let rule = RecurringRule::new(
        "Bill",
        20.0,
        TransactionKind::Expense,
        Frequency::Monthly,
        date(2026, 3, 1),
    );
    let rule_id = rule.id;
    book.post_events.push(PostEvent::new(
        rule_id,
        Uuid::new_v4(),
        date(2026, 3, 1),
        clock().now(),
    ));
    book.rules.push(rule.clone());
    let mut store = MemoryStore::new(book);

    let txn = Transaction::from_rule(&rule, date(2026, 3, 1));
    let mut advanced = rule;
    advanced.advance_schedule();
    let batch = WriteBatch::new()
        .with(WriteOp::InsertTransaction(txn.clone()))
        .with(WriteOp::InsertPostEvent(PostEvent::new(
            rule_id,
            txn.id,
            date(2026, 3, 1),
            clock().now(),
        )))
        .with(WriteOp::UpdateRule(advanced));

    assert!(matches!(
        store.commit(batch),
        Err(StoreError::DuplicatePostEvent { .. })
    ));
    // Nothing from the batch landed, including the transaction ahead of the
    // failing op.
    assert!(store.book().transactions.is_empty());
    assert_eq!(store.book().rule(rule_id).unwrap().next_due_date, date(2026, 3, 1));
}

#[test]
fn reconcile_records_exact_variance_without_mutating_entries() {
    let user = owner();
    let mut book = LedgerBook::new();
    let account_id = account_for(&mut book, user, 100.0);

    book.transactions.push(
        Transaction::new("Paycheck", 50.0, TransactionKind::Income, date(2026, 3, 1))
            .with_account(account_id)
            .cleared(),
    );
    book.transactions.push(
        Transaction::new("Utilities", 20.0, TransactionKind::Expense, date(2026, 3, 5))
            .with_account(account_id)
            .cleared(),
    );
    book.transactions.push(
        Transaction::new("Pending", 10.0, TransactionKind::Expense, date(2026, 3, 6))
            .with_account(account_id),
    );
    let mut store = MemoryStore::new(book);

    let statement = ReconcileService::reconcile(
        &mut store,
        user,
        account_id,
        date(2026, 3, 10),
        125.0,
        &clock(),
    )
    .unwrap();

    assert_eq!(statement.cleared_balance, 130.0);
    assert_eq!(statement.difference, -5.0);
    assert_eq!(store.book().statements.len(), 1);
    assert!(store.book().transactions.iter().any(|t| !t.is_cleared));

    let listed = ReconcileService::statements(&store, user, account_id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, statement.id);

    assert!(matches!(
        ReconcileService::reconcile(&mut store, owner(), account_id, date(2026, 3, 10), 0.0, &clock()),
        Err(EngineError::AccountNotFound(_))
    ));
}
