use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use hrms_leave::clock::FixedClock;
use hrms_leave::engine::{BalanceEntry, validate};
use hrms_leave::model::{BalanceKey, Command, LeaveCandidate, LeaveType};
use hrms_leave::store::MemoryStore;
use hrms_leave::{Days, EmployeeId, LeaveEngine, RequestId};
use tokio::runtime::Runtime;

const LEAVE_TYPE: u16 = 1;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Generates valid command sequences for benchmarking.
///
/// Pattern per employee (repeating):
/// 1. Submit a one day request
/// 2. Approve it
///
/// Start dates cycle through the year so every request stays inside the
/// booking horizon and consumes the same balance record.
pub struct CommandGenerator {
    next_request: RequestId,
    num_employees: EmployeeId,
    requests_per_employee: u32,
    current_employee: EmployeeId,
    current_step: u32,
}

impl CommandGenerator {
    pub fn new(num_employees: EmployeeId, requests_per_employee: u32) -> Self {
        Self {
            next_request: 1,
            num_employees,
            requests_per_employee,
            current_employee: 1,
            current_step: 0,
        }
    }
}

impl Iterator for CommandGenerator {
    type Item = Command;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_employee > self.num_employees {
            return None;
        }

        let command = if self.current_step % 2 == 0 {
            let offset = i64::from(self.current_step / 2 % 300) + 1;
            let start = today() + Duration::days(offset);
            Command::Submit(LeaveCandidate {
                id: self.next_request,
                employee: self.current_employee,
                leave_type: Some(LEAVE_TYPE),
                start: Some(start),
                end: Some(start),
                reason: "Personal errand".to_string(),
            })
        } else {
            let request = self.next_request;
            self.next_request += 1;
            Command::Approve { request }
        };

        self.current_step += 1;
        if self.current_step >= self.requests_per_employee * 2 {
            self.current_step = 0;
            self.current_employee += 1;
        }

        Some(command)
    }
}

/// A store with `employees` active employees and a large balance each.
fn seeded_store(employees: EmployeeId) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_leave_type(LeaveType {
        id: LEAVE_TYPE,
        name: "Annual".to_string(),
        max_per_year: Days::whole(18),
        accrual_rate: Days::from_float(1.5),
    });
    for employee in 1..=employees {
        store.add_employee(employee, true);
        store.put_balance(BalanceEntry::new(
            BalanceKey::new(employee, LEAVE_TYPE, 2025),
            Days::whole(1_000_000),
            Days::ZERO,
        ));
    }
    store
}

fn engine(store: Arc<MemoryStore>) -> LeaveEngine<MemoryStore> {
    LeaveEngine::new(store, Arc::new(FixedClock::on(today())))
        .without_rate_limiter()
}

fn bench_validate(c: &mut Criterion) {
    let start = today() + Duration::days(10);
    let end = start + Duration::days(4);

    c.bench_function("validate_range", |b| {
        b.iter(|| validate(black_box(Some(start)), black_box(Some(end)), today()));
    });
}

fn bench_submit_and_approve(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("submit_approve");

    for (employees, per) in [(1, 1_000), (100, 10), (1_000, 1)] {
        let label = format!("{}e_{}r", employees, per);
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(employees, per),
            |b, &(employees, per)| {
                b.iter(|| {
                    runtime.block_on(async {
                        let engine = engine(seeded_store(employees));
                        for command in CommandGenerator::new(employees, per) {
                            let _ = black_box(engine.apply(command).await);
                        }
                        engine
                    })
                });
            },
        );
    }

    group.finish();
}

fn bench_monthly_accrual(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("monthly_accrual");
    group.sample_size(20);

    for employees in [100u32, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(employees),
            &employees,
            |b, &employees| {
                b.iter(|| {
                    runtime.block_on(async {
                        let engine = engine(seeded_store(employees));
                        let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
                        black_box(engine.run_monthly_accrual(as_of).await)
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_validate,
    bench_submit_and_approve,
    bench_monthly_accrual,
);

criterion_main!(benches);
