//! Vport minimum-bandwidth admission and WFQ weight distribution.
//!
//! A vport is either explicitly configured with a minimum rate or shares
//! what is left of the PF minimum rate evenly with the other unconfigured
//! vports. Weights are expressed in parts of [`hw::WFQ_UNIT`], so a vport
//! weight of 1 is one percent of the PF minimum rate.

use qede_types::hw;
use tracing::{debug, warn};

use crate::callbacks::QmCallbacks;
use crate::error::{QmError, QmResult};
use crate::types::{QmInfo, WfqData};

impl QmInfo {
    /// Validates a minimum rate for one vport and redistributes the rest.
    ///
    /// `vport_id` is relative to the function. On failure nothing changes.
    pub fn request_min_bandwidth(
        &mut self,
        vport_id: u16,
        rate: u32,
        min_pf_rate: u32,
    ) -> QmResult<()> {
        let num_vports = self.wfq_vports();
        validate_min_bandwidth(&mut self.wfq_data[..num_vports], vport_id, rate, min_pf_rate)
    }

    /// Pushes the weight of every vport derived from its minimum rate.
    pub fn apply_all(&mut self, callbacks: &dyn QmCallbacks, min_pf_rate: u32) -> QmResult<()> {
        if min_pf_rate == 0 {
            return Err(QmError::invalid_config("PF min rate is unknown"));
        }

        for i in 0..self.wfq_vports() {
            let weight = wfq_weight(self.wfq_data[i].min_speed, min_pf_rate);
            let vport = &mut self.qm_vport_params[i];
            vport.vport_wfq = weight;
            callbacks.init_vport_wfq(&vport.first_tx_pq_id, weight)?;
        }

        debug!(
            "configured WFQ for {} vports [min_pf_rate {}]",
            self.wfq_vports(),
            min_pf_rate
        );
        Ok(())
    }

    /// Gives every vport an equal share.
    pub fn disable_all(&mut self, callbacks: &dyn QmCallbacks) -> QmResult<()> {
        for i in 0..self.wfq_vports() {
            let vport = &mut self.qm_vport_params[i];
            vport.vport_wfq = 1;
            callbacks.init_vport_wfq(&vport.first_tx_pq_id, vport.vport_wfq)?;
        }
        Ok(())
    }

    /// Re-validates every configured vport against a new PF minimum rate.
    ///
    /// Either all configured rates are accepted and pushed, or WFQ is
    /// disabled for every vport and the first rejection is returned.
    pub fn on_link_change(&mut self, callbacks: &dyn QmCallbacks, min_pf_rate: u32) -> QmResult<()> {
        let num_vports = self.wfq_vports();
        let mut scratch: Vec<WfqData> = self.wfq_data[..num_vports].to_vec();
        let mut use_wfq = false;

        for i in 0..num_vports {
            if !scratch[i].configured {
                continue;
            }
            use_wfq = true;

            let rate = scratch[i].min_speed;
            if let Err(err) = validate_min_bandwidth(&mut scratch, i as u16, rate, min_pf_rate) {
                warn!("WFQ validation failed while configuring min rate: {}", err);
                self.disable_all(callbacks)?;
                return Err(err);
            }
        }

        if !use_wfq {
            return self.disable_all(callbacks);
        }

        self.wfq_data[..num_vports].copy_from_slice(&scratch);
        self.apply_all(callbacks, min_pf_rate)
    }

    /// Number of vports with explicitly configured minimum rates.
    pub fn configured_vports(&self) -> usize {
        self.wfq_data.iter().filter(|d| d.configured).count()
    }

    /// Forgets every configured and distributed rate.
    pub fn clear_wfq_data(&mut self) {
        for data in self.wfq_data.iter_mut() {
            *data = WfqData::default();
        }
    }

    /// Vports taking part in WFQ: those of the current layout.
    fn wfq_vports(&self) -> usize {
        (self.num_vports as usize)
            .min(self.wfq_data.len())
            .min(self.qm_vport_params.len())
    }
}

/// Weight of a vport, in parts of the PF minimum rate, never below 1.
pub fn wfq_weight(min_speed: u32, min_pf_rate: u32) -> u16 {
    let rate = min_pf_rate as u64;
    let weight = (min_speed as u64 * hw::WFQ_UNIT as u64 + rate / 2) / rate;
    weight.clamp(1, u16::MAX as u64) as u16
}

fn validate_min_bandwidth(
    wfq_data: &mut [WfqData],
    vport_id: u16,
    rate: u32,
    min_pf_rate: u32,
) -> QmResult<()> {
    let num_vports = wfq_data.len();
    let vport = vport_id as usize;
    if vport >= num_vports {
        return Err(QmError::invalid_config(format!(
            "vport {} out of range ({} vports)",
            vport_id, num_vports
        )));
    }

    let one_percent = min_pf_rate / hw::WFQ_UNIT;

    if rate > min_pf_rate {
        return Err(QmError::invalid_config(format!(
            "vport [{}] - requested rate {} Mbps is greater than PF min rate {} Mbps",
            vport_id, rate, min_pf_rate
        )));
    }

    if rate < one_percent || rate == 0 {
        return Err(QmError::invalid_config(format!(
            "vport [{}] - requested rate {} Mbps is less than one percent of PF min rate {} Mbps",
            vport_id, rate, min_pf_rate
        )));
    }

    if num_vports > hw::WFQ_UNIT as usize {
        return Err(QmError::invalid_config(format!(
            "number of vports {} is greater than {}",
            num_vports,
            hw::WFQ_UNIT
        )));
    }

    let mut total_req = rate as u64;
    let mut req_count = 1usize;
    for (i, data) in wfq_data.iter().enumerate() {
        if i != vport && data.configured {
            total_req += data.min_speed as u64;
            req_count += 1;
        }
    }

    if total_req > min_pf_rate as u64 {
        return Err(QmError::invalid_config(format!(
            "total requested min rate {} Mbps is greater than PF min rate {} Mbps",
            total_req, min_pf_rate
        )));
    }

    let non_requested = num_vports - req_count;
    let left_per_vport = if non_requested == 0 {
        0
    } else {
        let left = (min_pf_rate as u64 - total_req) / non_requested as u64;
        if left < one_percent as u64 {
            return Err(QmError::invalid_config(format!(
                "non WFQ configured vports rate {} Mbps is less than one percent of PF min rate {} Mbps",
                left, min_pf_rate
            )));
        }
        left as u32
    };

    wfq_data[vport] = WfqData {
        min_speed: rate,
        configured: true,
    };
    for data in wfq_data.iter_mut().filter(|d| !d.configured) {
        data.min_speed = left_per_vport;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VportParams;
    use pretty_assertions::assert_eq;
    use qede_types::{ChipTopology, FunctionProfile, ResourceBudget, ResourceGrant};
    use std::sync::Mutex;

    use crate::planner::PlanInputs;

    struct TestCallbacks {
        weights: Mutex<Vec<(u16, u16)>>,
    }

    impl TestCallbacks {
        fn new() -> Self {
            Self {
                weights: Mutex::new(Vec::new()),
            }
        }

        fn take_weights(&self) -> Vec<(u16, u16)> {
            std::mem::take(&mut *self.weights.lock().unwrap())
        }
    }

    impl QmCallbacks for TestCallbacks {
        fn init_vport_wfq(&self, first_tx_pq_id: &[u16; hw::NUM_OF_TCS], weight: u16) -> QmResult<()> {
            self.weights.lock().unwrap().push((first_tx_pq_id[0], weight));
            Ok(())
        }

        fn init_pf_rl(&self, _pf_id: u8, _rate_mbps: u32) -> QmResult<()> {
            Ok(())
        }

        fn init_pf_wfq(&self, _pf_id: u8, _weight: u8) -> QmResult<()> {
            Ok(())
        }

        fn send_qm_cmd(
            &self,
            _command: crate::callbacks::QmCommand,
            _start_pq: u16,
            _num_pqs: u16,
        ) -> QmResult<()> {
            Ok(())
        }

        fn clear_runtime_data(&self) -> QmResult<()> {
            Ok(())
        }

        fn program_qm_pf(&self, _runtime: &crate::callbacks::QmPfRuntime) -> QmResult<()> {
            Ok(())
        }
    }

    /// Layout with `n` vports: n - 1 rate-limited PQs plus the shared one.
    fn qm_with_vports(n: u16) -> QmInfo {
        let profile = FunctionProfile::default();
        let topology = ChipTopology::default();
        let budget = ResourceBudget {
            pqs: ResourceGrant::new(256, 0),
            vports: ResourceGrant::new(n, 0),
            rate_limiters: ResourceGrant::new(256, 0),
        };
        let inputs = PlanInputs::new(&profile, &topology, &budget);
        let mut qm = QmInfo::new(&inputs).unwrap();
        qm.init_qm_info(&inputs).unwrap();
        assert_eq!(qm.num_vports, n);
        qm
    }

    #[test]
    fn test_weight_rounding() {
        assert_eq!(wfq_weight(5000, 10000), 50);
        assert_eq!(wfq_weight(3333, 10000), 33);
        assert_eq!(wfq_weight(3350, 10000), 34);
        assert_eq!(wfq_weight(0, 10000), 1);
    }

    #[test]
    fn test_request_distributes_leftover() {
        let mut qm = qm_with_vports(4);
        qm.request_min_bandwidth(0, 4000, 10000).unwrap();

        assert_eq!(
            qm.wfq_data,
            vec![
                WfqData {
                    min_speed: 4000,
                    configured: true
                },
                WfqData {
                    min_speed: 2000,
                    configured: false
                },
                WfqData {
                    min_speed: 2000,
                    configured: false
                },
                WfqData {
                    min_speed: 2000,
                    configured: false
                },
            ]
        );
    }

    #[test]
    fn test_reconfigure_same_vport_replaces_rate() {
        let mut qm = qm_with_vports(2);
        qm.request_min_bandwidth(0, 9000, 10000).unwrap();
        qm.request_min_bandwidth(0, 5000, 10000).unwrap();
        assert_eq!(qm.wfq_data[0].min_speed, 5000);
        assert_eq!(qm.wfq_data[1].min_speed, 5000);
    }

    #[test]
    fn test_request_rejections_leave_state() {
        let mut qm = qm_with_vports(3);
        qm.request_min_bandwidth(1, 3000, 10000).unwrap();
        let before = qm.wfq_data.clone();

        // Above the PF minimum.
        assert!(qm.request_min_bandwidth(0, 10001, 10000).is_err());
        // Below one percent.
        assert!(qm.request_min_bandwidth(0, 99, 10000).is_err());
        // Leaves vport 2 with less than one percent.
        assert!(qm.request_min_bandwidth(0, 6950, 10000).is_err());
        // Out of range.
        assert!(qm.request_min_bandwidth(3, 1000, 10000).is_err());

        assert_eq!(qm.wfq_data, before);
    }

    #[test]
    fn test_all_vports_configured_skips_leftover() {
        let mut qm = qm_with_vports(2);
        qm.request_min_bandwidth(0, 3000, 10000).unwrap();
        qm.request_min_bandwidth(1, 7000, 10000).unwrap();
        assert_eq!(qm.configured_vports(), 2);
    }

    #[test]
    fn test_too_many_vports() {
        let mut qm = qm_with_vports(101);
        let err = qm.request_min_bandwidth(0, 1000, 100_000).unwrap_err();
        assert!(err.to_string().contains("number of vports"));
    }

    #[test]
    fn test_apply_all_pushes_weights() {
        let mut qm = qm_with_vports(2);
        let callbacks = TestCallbacks::new();
        qm.request_min_bandwidth(1, 2500, 10000).unwrap();
        qm.apply_all(&callbacks, 10000).unwrap();

        let heads: Vec<u16> = qm.qm_vport_params[..2]
            .iter()
            .map(|v| v.first_tx_pq_id[0])
            .collect();
        assert_eq!(
            callbacks.take_weights(),
            vec![(heads[0], 75), (heads[1], 25)]
        );
        assert_eq!(qm.qm_vport_params[1].vport_wfq, 25);
    }

    #[test]
    fn test_apply_all_requires_min_rate() {
        let mut qm = qm_with_vports(2);
        let err = qm.apply_all(&TestCallbacks::new(), 0).unwrap_err();
        assert!(matches!(err, QmError::InvalidConfig { .. }));
    }

    #[test]
    fn test_link_change_without_configured_vports_disables() {
        let mut qm = qm_with_vports(3);
        let callbacks = TestCallbacks::new();
        qm.on_link_change(&callbacks, 25000).unwrap();

        let weights: Vec<u16> = callbacks.take_weights().into_iter().map(|(_, w)| w).collect();
        assert_eq!(weights, vec![1, 1, 1]);
    }

    #[test]
    fn test_link_change_failure_disables_all() {
        let mut qm = qm_with_vports(3);
        let callbacks = TestCallbacks::new();
        qm.request_min_bandwidth(0, 8000, 10000).unwrap();
        qm.apply_all(&callbacks, 10000).unwrap();
        callbacks.take_weights();

        // 8000 no longer fits a 5000 Mbps PF minimum.
        assert!(qm.on_link_change(&callbacks, 5000).is_err());
        let weights: Vec<u16> = callbacks.take_weights().into_iter().map(|(_, w)| w).collect();
        assert_eq!(weights, vec![1, 1, 1]);
        assert!(qm
            .qm_vport_params
            .iter()
            .all(|v: &VportParams| v.vport_wfq == 1));
        // The request itself is kept for the next link change.
        assert_eq!(qm.wfq_data[0].min_speed, 8000);
        assert!(qm.wfq_data[0].configured);
    }

    #[test]
    fn test_link_change_revalidates_and_applies() {
        let mut qm = qm_with_vports(2);
        let callbacks = TestCallbacks::new();
        qm.request_min_bandwidth(0, 4000, 10000).unwrap();

        qm.on_link_change(&callbacks, 20000).unwrap();
        assert_eq!(qm.wfq_data[1].min_speed, 16000);
        let weights: Vec<u16> = callbacks.take_weights().into_iter().map(|(_, w)| w).collect();
        assert_eq!(weights, vec![20, 80]);
    }

    #[test]
    fn test_clear_wfq_data() {
        let mut qm = qm_with_vports(2);
        qm.request_min_bandwidth(0, 4000, 10000).unwrap();
        qm.clear_wfq_data();
        assert_eq!(qm.configured_vports(), 0);
        assert!(qm.wfq_data.iter().all(|d| d.min_speed == 0));
    }
}
