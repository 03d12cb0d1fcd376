//! End-to-end flows through the treasury engine: immediate transfers, quorum
//! approvals, the emergency freeze, and the invariants that hold across
//! arbitrary operation sequences.

use coffer_core::{
    AdminCapability, ApprovalOutcome, Treasury, TreasuryConfig, TreasuryError,
};
use coffer_types::{
    Address, AgentId, MemoryEventSink, SecurityTier, TransferMode, TreasuryEvent,
};
use proptest::prelude::*;
use std::sync::Arc;

const HOUR_MS: u64 = 3_600_000;

fn signers() -> [Address; 3] {
    [Address::new("s1"), Address::new("s2"), Address::new("s3")]
}

fn config(approval_threshold: u64, daily_limit: u64) -> TreasuryConfig {
    TreasuryConfig::new(
        Address::new("admin"),
        Address::new("cold"),
        Address::new("hot"),
        approval_threshold,
        daily_limit,
        signers(),
        2,
    )
}

fn setup(
    approval_threshold: u64,
    daily_limit: u64,
) -> (Treasury, AdminCapability, Arc<MemoryEventSink>) {
    let sink = Arc::new(MemoryEventSink::new());
    let (treasury, admin) = Treasury::initialize(
        config(approval_threshold, daily_limit),
        sink.clone(),
        0,
    )
    .expect("valid config");
    (treasury, admin, sink)
}

#[test]
fn small_transfer_executes_immediately() {
    // Scenario: threshold 100_000, daily limit 60_000, 2-of-3 signers.
    let (treasury, admin, _sink) = setup(100_000, 60_000);
    treasury.deposit(50_000).unwrap();

    let cap = treasury
        .allocate(
            &admin,
            AgentId::new("A"),
            5_000,
            SecurityTier::Standard,
            HOUR_MS,
            0,
        )
        .unwrap();

    let pending = treasury
        .transfer(&cap, Address::new("R"), 4_000, "supplies", 10)
        .unwrap();

    assert!(pending.is_none(), "4_000 < 100_000 must not open an approval");
    assert_eq!(treasury.balance().unwrap(), 46_000);
    let status = treasury.allocation_of(&AgentId::new("A")).unwrap();
    assert_eq!(status.spent, 4_000);
}

#[test]
fn large_transfer_requires_quorum_and_executes_on_second_signature() {
    let (treasury, admin, _sink) = setup(100_000, 200_000);
    treasury.deposit(150_000).unwrap();

    let cap = treasury
        .allocate(
            &admin,
            AgentId::new("B"),
            150_000,
            SecurityTier::Elevated,
            HOUR_MS,
            0,
        )
        .unwrap();

    let id = treasury
        .transfer(&cap, Address::new("R"), 120_000, "vendor payout", 10)
        .unwrap()
        .expect("120_000 >= 100_000 must route to quorum");

    // One signature is not enough for a 2-of-3 policy.
    let outcome = treasury.approve(id, Address::new("s1"), 20).unwrap();
    assert_eq!(
        outcome,
        ApprovalOutcome::Pending {
            approval_count: 1,
            required_signatures: 2
        }
    );
    assert_eq!(treasury.balance().unwrap(), 150_000);

    // The same signer cannot sign twice, and the count is unchanged.
    assert_eq!(
        treasury.approve(id, Address::new("s1"), 30).unwrap_err(),
        TreasuryError::DuplicateApprover(Address::new("s1"))
    );
    assert_eq!(treasury.pending_approval(id).unwrap().approval_count, 1);

    // The second distinct signature executes the debit and removes the entry.
    assert_eq!(
        treasury.approve(id, Address::new("s2"), 40).unwrap(),
        ApprovalOutcome::Executed
    );
    assert_eq!(treasury.balance().unwrap(), 30_000);
    assert_eq!(
        treasury.pending_approval(id).unwrap_err(),
        TreasuryError::NotFound(id)
    );
}

#[test]
fn quorum_execution_does_not_touch_allocation_spent() {
    // Deliberate, preserved accounting gap: only the immediate path maintains
    // the per-agent spent counter. A quorum-executed transfer debits the pool
    // but leaves the requesting agent's budget usage unchanged.
    let (treasury, admin, _sink) = setup(100_000, 200_000);
    treasury.deposit(150_000).unwrap();

    let cap = treasury
        .allocate(
            &admin,
            AgentId::new("B"),
            150_000,
            SecurityTier::Elevated,
            HOUR_MS,
            0,
        )
        .unwrap();
    let id = treasury
        .transfer(&cap, Address::new("R"), 120_000, "", 10)
        .unwrap()
        .unwrap();
    treasury.approve(id, Address::new("s1"), 20).unwrap();
    treasury.approve(id, Address::new("s2"), 30).unwrap();

    assert_eq!(treasury.balance().unwrap(), 30_000);
    let status = treasury.allocation_of(&AgentId::new("B")).unwrap();
    assert_eq!(status.spent, 0, "quorum path must not update spent");
}

#[test]
fn freeze_halts_everything_and_unfreeze_restores_prior_state() {
    let (treasury, admin, _sink) = setup(100_000, 60_000);
    treasury.deposit(50_000).unwrap();
    let cap = treasury
        .allocate(
            &admin,
            AgentId::new("A"),
            5_000,
            SecurityTier::Standard,
            HOUR_MS,
            0,
        )
        .unwrap();
    treasury
        .transfer(&cap, Address::new("R"), 2_000, "", 10)
        .unwrap();

    treasury.freeze(&admin, "incident", 20).unwrap();

    for amount in [1_u64, 4_000, 120_000] {
        assert_eq!(
            treasury
                .transfer(&cap, Address::new("R"), amount, "", 30)
                .unwrap_err(),
            TreasuryError::EmergencyModeActive,
            "every transfer amount must be blocked while frozen"
        );
    }
    assert_eq!(
        treasury
            .allocate(
                &admin,
                AgentId::new("C"),
                10,
                SecurityTier::Basic,
                HOUR_MS,
                30
            )
            .unwrap_err(),
        TreasuryError::EmergencyModeActive
    );

    treasury.unfreeze(&admin).unwrap();

    // All prior state is unchanged.
    assert_eq!(treasury.balance().unwrap(), 48_000);
    assert_eq!(
        treasury.allocation_of(&AgentId::new("A")).unwrap().spent,
        2_000
    );
    assert_eq!(treasury.daily_spending().unwrap().spent, 5_000);
    assert!(treasury
        .transfer(&cap, Address::new("R"), 1_000, "", 40)
        .is_ok());
}

#[test]
fn second_allocation_for_the_same_agent_fails() {
    let (treasury, admin, _sink) = setup(100_000, 60_000);
    treasury.deposit(50_000).unwrap();

    treasury
        .allocate(
            &admin,
            AgentId::new("A"),
            5_000,
            SecurityTier::Standard,
            HOUR_MS,
            0,
        )
        .unwrap();
    assert_eq!(
        treasury
            .allocate(
                &admin,
                AgentId::new("A"),
                1_000,
                SecurityTier::Standard,
                HOUR_MS,
                10
            )
            .unwrap_err(),
        TreasuryError::DuplicateAgentAllocation(AgentId::new("A"))
    );
}

#[test]
fn allocation_boundary_matches_the_daily_limit_exactly() {
    let (treasury, admin, _sink) = setup(100_000, 60_000);
    treasury.deposit(50_000).unwrap();

    treasury
        .allocate(
            &admin,
            AgentId::new("A"),
            20_000,
            SecurityTier::Standard,
            HOUR_MS,
            0,
        )
        .unwrap();

    // Exactly the remaining room succeeds ...
    treasury
        .allocate(
            &admin,
            AgentId::new("B"),
            40_000,
            SecurityTier::Standard,
            HOUR_MS,
            10,
        )
        .unwrap();

    // ... and one unit more fails.
    assert_eq!(
        treasury
            .allocate(
                &admin,
                AgentId::new("C"),
                1,
                SecurityTier::Standard,
                HOUR_MS,
                20
            )
            .unwrap_err(),
        TreasuryError::DailyLimitExceeded {
            requested: 1,
            remaining: 0
        }
    );
    assert_eq!(treasury.daily_spending().unwrap().spent, 60_000);
}

#[test]
fn deposit_round_trip_increases_balance_exactly() {
    let (treasury, _admin, _sink) = setup(100_000, 60_000);
    assert_eq!(treasury.balance().unwrap(), 0);
    treasury.deposit(0).unwrap();
    assert_eq!(treasury.balance().unwrap(), 0);
    treasury.deposit(50_000).unwrap();
    assert_eq!(treasury.balance().unwrap(), 50_000);
    treasury.deposit(7).unwrap();
    assert_eq!(treasury.balance().unwrap(), 50_007);
}

#[test]
fn quorum_flow_emits_events_in_order() {
    let (treasury, admin, sink) = setup(100_000, 200_000);
    treasury.deposit(150_000).unwrap();
    let cap = treasury
        .allocate(
            &admin,
            AgentId::new("B"),
            150_000,
            SecurityTier::Elevated,
            HOUR_MS,
            0,
        )
        .unwrap();
    let id = treasury
        .transfer(&cap, Address::new("R"), 120_000, "payout", 10)
        .unwrap()
        .unwrap();
    treasury.approve(id, Address::new("s1"), 20).unwrap();
    treasury.approve(id, Address::new("s2"), 30).unwrap();

    let events = sink.snapshot();
    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], TreasuryEvent::TreasuryCreated { .. }));
    assert!(matches!(events[1], TreasuryEvent::AgentAllocated { .. }));
    assert!(matches!(events[2], TreasuryEvent::ApprovalRequested { .. }));
    assert!(matches!(
        events[3],
        TreasuryEvent::ApprovalProvided {
            approval_count: 1,
            ..
        }
    ));
    assert!(matches!(
        events[4],
        TreasuryEvent::ApprovalProvided {
            approval_count: 2,
            ..
        }
    ));
    match &events[5] {
        TreasuryEvent::FundsTransferred {
            mode,
            amount,
            agent,
            ..
        } => {
            assert_eq!(*mode, TransferMode::Quorum);
            assert_eq!(*amount, 120_000);
            assert!(agent.is_none(), "quorum executions carry no agent id");
        }
        other => panic!("expected funds_transferred, got {other:?}"),
    }
}

#[test]
fn immediate_transfer_event_carries_the_agent() {
    let (treasury, admin, sink) = setup(100_000, 60_000);
    treasury.deposit(50_000).unwrap();
    let cap = treasury
        .allocate(
            &admin,
            AgentId::new("A"),
            5_000,
            SecurityTier::Standard,
            HOUR_MS,
            0,
        )
        .unwrap();
    treasury
        .transfer(&cap, Address::new("R"), 4_000, "supplies", 10)
        .unwrap();

    let events = sink.snapshot();
    match events.last().unwrap() {
        TreasuryEvent::FundsTransferred { mode, agent, .. } => {
            assert_eq!(*mode, TransferMode::Immediate);
            assert_eq!(agent.as_ref(), Some(&AgentId::new("A")));
        }
        other => panic!("expected funds_transferred, got {other:?}"),
    }
}

#[derive(Debug, Clone)]
enum Op {
    Allocate { amount: u64 },
    Transfer { agent_index: usize, amount: u64 },
}

fn op_strategy() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            (1_u64..30_000).prop_map(|amount| Op::Allocate { amount }),
            ((0_usize..8), (1_u64..40_000))
                .prop_map(|(agent_index, amount)| Op::Transfer { agent_index, amount }),
        ],
        0..24,
    )
}

proptest! {
    /// Across arbitrary allocate/transfer sequences, the daily issuance never
    /// exceeds its limit and every hot-path allocation keeps spent within its
    /// budget.
    #[test]
    fn invariants_hold_over_arbitrary_sequences(ops in op_strategy()) {
        let (treasury, admin, _sink) = setup(100_000, 60_000);
        treasury.deposit(1_000_000).unwrap();

        let mut caps = Vec::new();
        let mut next_agent = 0_usize;
        let mut now_ms = 1_u64;

        for op in ops {
            now_ms += 1;
            match op {
                Op::Allocate { amount } => {
                    let agent = AgentId::new(format!("agent-{next_agent}"));
                    next_agent += 1;
                    if let Ok(cap) = treasury.allocate(
                        &admin,
                        agent,
                        amount,
                        SecurityTier::Standard,
                        HOUR_MS,
                        now_ms,
                    ) {
                        caps.push(cap);
                    }
                }
                Op::Transfer { agent_index, amount } => {
                    if let Some(cap) = caps.get(agent_index) {
                        let _ = treasury.transfer(
                            cap,
                            Address::new("R"),
                            amount,
                            "",
                            now_ms,
                        );
                    }
                }
            }

            let window = treasury.daily_spending().unwrap();
            prop_assert!(window.spent <= window.limit);
        }

        for cap in &caps {
            let status = treasury.allocation_of(cap.agent()).unwrap();
            prop_assert!(status.spent <= status.allocated);
        }
    }
}
