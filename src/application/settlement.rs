//! Oracle candidate intake, finalization and the claim gate.
//!
//! For a market with reference time `s` (its settlement timestamp, or its
//! end when unset):
//!
//! ```text
//! now < s                      submit -> SettlementTooEarly
//! s <= now <= s + window       submit accepted, nearest sample retained
//! now > s + window             submit -> SettlementFinalizeWindowClosed
//!                              finalize allowed
//! now >= s + finalize_deadline payouts claimable
//! ```

use alloy_primitives::Address;
use tracing::{info, warn};

use crate::domain::settlement::recover_signer;
use crate::domain::{Market, MarketError, ProtocolLimits, SettlementCandidate, SettlementError};
use crate::error::Result;

/// Result of submitting a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The sample is now the retained candidate.
    Retained(SettlementCandidate),
    /// A closer (or equally close and earlier) sample was already held.
    Ignored { best: SettlementCandidate },
}

#[derive(Debug, Clone)]
pub struct SettlementMachine {
    oracle_signer: Address,
    submit_window_secs: u64,
    finalize_deadline_secs: u64,
}

impl SettlementMachine {
    #[must_use]
    pub fn new(oracle_signer: Address, limits: &ProtocolLimits) -> Self {
        Self {
            oracle_signer,
            submit_window_secs: limits.submit_window_secs,
            finalize_deadline_secs: limits.finalize_deadline_secs,
        }
    }

    #[must_use]
    pub const fn oracle_signer(&self) -> Address {
        self.oracle_signer
    }

    pub fn set_oracle_signer(&mut self, signer: Address) {
        info!(old = %self.oracle_signer, new = %signer, "Oracle signer changed");
        self.oracle_signer = signer;
    }

    fn submission_close(&self, market: &Market) -> u64 {
        market
            .settlement_reference()
            .saturating_add(self.submit_window_secs)
    }

    /// Earliest instant payouts may be claimed.
    #[must_use]
    pub fn claim_open_at(&self, market: &Market) -> u64 {
        market.claim_open_timestamp(self.finalize_deadline_secs)
    }

    /// Verify and record an oracle sample.
    pub fn submit(
        &self,
        market: &mut Market,
        value: i64,
        price_timestamp: u64,
        signature: &[u8],
        now: u64,
    ) -> Result<Submission> {
        if market.is_settled() {
            return Err(MarketError::MarketAlreadySettled(market.id()).into());
        }
        let target = market.settlement_reference();
        if now < target {
            return Err(SettlementError::SettlementTooEarly {
                open_at: target,
                now,
            }
            .into());
        }
        let closed_at = self.submission_close(market);
        if now > closed_at {
            return Err(SettlementError::SettlementFinalizeWindowClosed { closed_at, now }.into());
        }
        if price_timestamp > now {
            return Err(SettlementError::SettlementPriceFromFuture {
                price_timestamp,
                now,
            }
            .into());
        }

        let signer = recover_signer(market.id(), value, price_timestamp, signature);
        if signer != Some(self.oracle_signer) {
            warn!(
                market_id = %market.id(),
                recovered = ?signer,
                expected = %self.oracle_signer,
                "Rejected settlement submission"
            );
            return Err(SettlementError::SettlementOracleSignatureInvalid.into());
        }

        let candidate = SettlementCandidate::new(value, price_timestamp, target);
        match market.candidate() {
            Some(best) if !candidate.is_better_than(&best) => Ok(Submission::Ignored { best }),
            _ => {
                market.set_candidate(candidate);
                info!(
                    market_id = %market.id(),
                    value,
                    price_timestamp,
                    distance = candidate.distance,
                    "Settlement candidate retained"
                );
                Ok(Submission::Retained(candidate))
            }
        }
    }

    /// Commit the retained candidate once the submission window has closed.
    /// Returns the winning tick.
    pub fn finalize(&self, market: &mut Market, force_default: bool, now: u64) -> Result<i64> {
        if market.is_settled() {
            return Err(MarketError::MarketAlreadySettled(market.id()).into());
        }
        let closes_at = self.submission_close(market);
        if now <= closes_at {
            return Err(SettlementError::SettlementWindowOpen { closes_at, now }.into());
        }
        let value = match market.candidate() {
            Some(candidate) => candidate.value,
            None if force_default => {
                warn!(market_id = %market.id(), "No candidate, settling at midpoint");
                market.midpoint_tick()
            }
            None => return Err(SettlementError::SettlementCandidateMissing(market.id()).into()),
        };
        let tick = market.settle(value)?;
        info!(market_id = %market.id(), value, tick, "Settlement finalized");
        Ok(tick)
    }

    /// Administrative override: settle at `value` once the market has ended.
    pub fn settle(&self, market: &mut Market, value: i64, now: u64) -> Result<i64> {
        if market.is_settled() {
            return Err(MarketError::MarketAlreadySettled(market.id()).into());
        }
        if now < market.end_timestamp() {
            return Err(SettlementError::SettlementTooEarly {
                open_at: market.end_timestamp(),
                now,
            }
            .into());
        }
        let tick = market.settle(value)?;
        info!(market_id = %market.id(), value, tick, "Market settled by admin");
        Ok(tick)
    }

    /// Fails unless `market` is settled and its claim gate has opened.
    pub fn require_claimable(&self, market: &Market, now: u64) -> Result<i64> {
        let tick = market
            .settled_tick()
            .ok_or(MarketError::MarketNotSettled(market.id()))?;
        let open_at = self.claim_open_at(market);
        if now < open_at {
            return Err(SettlementError::SettlementTooEarly { open_at, now }.into());
        }
        Ok(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::OracleSigner;
    use crate::domain::wad::WAD;
    use crate::domain::{MarketId, MarketParams, MarketPhase};
    use crate::error::Error;

    const SETTLE_AT: u64 = 10_000;

    fn market() -> Market {
        let params = MarketParams {
            id: None,
            min_tick: 0,
            max_tick: 1_000,
            tick_spacing: 10,
            start_timestamp: 1_000,
            end_timestamp: 9_000,
            settlement_timestamp: Some(SETTLE_AT),
            alpha: WAD,
        };
        Market::try_new(MarketId::new(1), &params, &ProtocolLimits::default()).unwrap()
    }

    fn setup() -> (OracleSigner, SettlementMachine, Market) {
        let oracle = OracleSigner::random();
        let machine = SettlementMachine::new(oracle.address(), &ProtocolLimits::default());
        (oracle, machine, market())
    }

    fn submit(
        oracle: &OracleSigner,
        machine: &SettlementMachine,
        market: &mut Market,
        value: i64,
        price_timestamp: u64,
        now: u64,
    ) -> Result<Submission> {
        let signature = oracle
            .sign_settlement(market.id(), value, price_timestamp)
            .unwrap();
        machine.submit(market, value, price_timestamp, &signature, now)
    }

    #[test]
    fn nearest_candidate_is_retained() {
        let (oracle, machine, mut market) = setup();
        let now = SETTLE_AT + 200;
        submit(&oracle, &machine, &mut market, 500, SETTLE_AT + 120, now).unwrap();
        submit(&oracle, &machine, &mut market, 510, SETTLE_AT + 5, now).unwrap();
        let ignored = submit(&oracle, &machine, &mut market, 520, SETTLE_AT + 60, now).unwrap();
        assert!(matches!(ignored, Submission::Ignored { .. }));
        assert_eq!(market.candidate().unwrap().value, 510);
    }

    #[test]
    fn tie_prefers_earlier_timestamp() {
        let (oracle, machine, mut market) = setup();
        let now = SETTLE_AT + 10;
        submit(&oracle, &machine, &mut market, 1, SETTLE_AT + 5, now).unwrap();
        submit(&oracle, &machine, &mut market, 2, SETTLE_AT - 5, now).unwrap();
        submit(&oracle, &machine, &mut market, 3, SETTLE_AT + 5, now).unwrap();
        assert_eq!(market.candidate().unwrap().value, 2);
    }

    #[test]
    fn submission_window_is_enforced() {
        let (oracle, machine, mut market) = setup();
        assert!(matches!(
            submit(&oracle, &machine, &mut market, 1, SETTLE_AT - 1, SETTLE_AT - 1),
            Err(Error::Settlement(SettlementError::SettlementTooEarly { .. }))
        ));
        assert!(matches!(
            submit(&oracle, &machine, &mut market, 1, SETTLE_AT, SETTLE_AT + 301),
            Err(Error::Settlement(SettlementError::SettlementFinalizeWindowClosed { .. }))
        ));
        assert!(submit(&oracle, &machine, &mut market, 1, SETTLE_AT, SETTLE_AT + 300).is_ok());
    }

    #[test]
    fn future_price_is_rejected() {
        let (oracle, machine, mut market) = setup();
        assert!(matches!(
            submit(&oracle, &machine, &mut market, 1, SETTLE_AT + 50, SETTLE_AT + 10),
            Err(Error::Settlement(SettlementError::SettlementPriceFromFuture { .. }))
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let (_, machine, mut market) = setup();
        let impostor = OracleSigner::random();
        let result = submit(&impostor, &machine, &mut market, 1, SETTLE_AT, SETTLE_AT);
        assert!(matches!(
            result,
            Err(Error::Settlement(SettlementError::SettlementOracleSignatureInvalid))
        ));
        assert!(market.candidate().is_none());
    }

    #[test]
    fn finalize_waits_for_window_and_needs_candidate() {
        let (oracle, machine, mut market) = setup();
        assert!(matches!(
            machine.finalize(&mut market, false, SETTLE_AT + 300),
            Err(Error::Settlement(SettlementError::SettlementWindowOpen { .. }))
        ));
        assert!(matches!(
            machine.finalize(&mut market, false, SETTLE_AT + 301),
            Err(Error::Settlement(SettlementError::SettlementCandidateMissing(_)))
        ));

        submit(&oracle, &machine, &mut market, 437, SETTLE_AT, SETTLE_AT).unwrap();
        assert_eq!(machine.finalize(&mut market, false, SETTLE_AT + 301).unwrap(), 430);
        assert!(market.is_settled());
        assert!(market.candidate().is_none());
    }

    #[test]
    fn force_default_settles_at_midpoint() {
        let (_, machine, mut market) = setup();
        assert_eq!(machine.finalize(&mut market, true, SETTLE_AT + 301).unwrap(), 500);
    }

    #[test]
    fn admin_settle_requires_end() {
        let (_, machine, mut market) = setup();
        assert!(machine.settle(&mut market, 10, 8_999).is_err());
        assert_eq!(machine.settle(&mut market, 10, 9_000).unwrap(), 10);
        assert!(matches!(
            machine.settle(&mut market, 10, 9_000),
            Err(Error::Market(MarketError::MarketAlreadySettled(_)))
        ));
    }

    #[test]
    fn claim_gate_opens_after_deadline() {
        let (_, machine, mut market) = setup();
        assert!(matches!(
            machine.require_claimable(&market, SETTLE_AT + 2_000),
            Err(Error::Market(MarketError::MarketNotSettled(_)))
        ));
        machine.finalize(&mut market, true, SETTLE_AT + 301).unwrap();
        let open = machine.claim_open_at(&market);
        assert_eq!(open, SETTLE_AT + 900);
        assert!(matches!(
            machine.require_claimable(&market, open - 10),
            Err(Error::Settlement(SettlementError::SettlementTooEarly { open_at, .. })) if open_at == open
        ));
        assert_eq!(machine.require_claimable(&market, open + 1).unwrap(), 500);
    }

    #[test]
    fn claim_gate_and_phase_agree_for_custom_deadlines() {
        let limits = ProtocolLimits {
            submit_window_secs: 60,
            finalize_deadline_secs: 4_321,
            ..ProtocolLimits::default()
        };
        let machine = SettlementMachine::new(Address::ZERO, &limits);
        let mut market = market();
        machine.settle(&mut market, 250, SETTLE_AT).unwrap();

        let open = machine.claim_open_at(&market);
        assert_eq!(open, SETTLE_AT + 4_321);
        assert_eq!(market.phase(open - 1, &limits), MarketPhase::Finalized);
        assert!(machine.require_claimable(&market, open - 1).is_err());
        assert_eq!(market.phase(open, &limits), MarketPhase::ClaimOpen);
        assert_eq!(machine.require_claimable(&market, open).unwrap(), 250);
    }
}
