//! PF bandwidth limits and the function-level WFQ entry points.

use qede_types::{hw, validate_percent};
use tracing::{debug, warn};

use crate::error::{QmError, QmResult};
use crate::function::QmFunction;

impl QmFunction {
    /// Sets the PF maximum bandwidth as a percent of line speed.
    ///
    /// 100 percent programs [`hw::PF_RL_UNLIMITED_MBPS`] so that switched
    /// traffic is never throttled when no limit was asked for.
    pub fn configure_pf_max_bandwidth(&mut self, max_bw: u8) -> QmResult<()> {
        let max_bw = validate_percent(max_bw)?;
        self.link.bandwidth_max = max_bw;

        if !self.link.is_up() && max_bw != 100 {
            return Ok(());
        }

        self.apply_pf_max_bandwidth()
    }

    fn apply_pf_max_bandwidth(&mut self) -> QmResult<()> {
        let callbacks = self.callbacks()?;
        let max_bw = self.link.bandwidth_max;

        self.link.speed = self.link.percent_of_line(max_bw);
        let pf_rl = if max_bw == 100 {
            hw::PF_RL_UNLIMITED_MBPS
        } else {
            self.link.speed
        };

        if let Some(qm) = self.qm_info.as_mut() {
            qm.pf_rl = pf_rl;
        }
        callbacks.init_pf_rl(self.profile.pf_id, pf_rl)?;

        debug!("configured MAX bandwidth to be {} Mb/sec", self.link.speed);
        Ok(())
    }

    /// Sets the PF minimum bandwidth as a percent of line speed and
    /// re-validates the vport minimum rates against it.
    pub fn configure_pf_min_bandwidth(&mut self, min_bw: u8) -> QmResult<()> {
        let min_bw = validate_percent(min_bw)?;
        self.link.bandwidth_min = min_bw;
        if let Some(qm) = self.qm_info.as_mut() {
            qm.pf_wfq = min_bw;
        }

        if !self.link.is_up() {
            return Ok(());
        }

        self.apply_pf_min_bandwidth()
    }

    fn apply_pf_min_bandwidth(&mut self) -> QmResult<()> {
        let callbacks = self.callbacks()?;
        let min_bw = self.link.bandwidth_min;

        self.link.min_pf_rate = self.link.percent_of_line(min_bw);
        callbacks.init_pf_wfq(self.profile.pf_id, min_bw)?;
        debug!("configured MIN bandwidth to be {} Mb/sec", self.link.min_pf_rate);

        let min_pf_rate = self.link.min_pf_rate;
        match self.qm_info.as_mut() {
            Some(qm) if min_pf_rate != 0 => qm.on_link_change(callbacks.as_ref(), min_pf_rate),
            _ => Ok(()),
        }
    }

    /// Requests a minimum rate (Mbps) for a vport of this function.
    ///
    /// While the PF minimum rate is unknown the request is only recorded;
    /// it is validated on the next link change.
    pub fn configure_vport_wfq(&mut self, vport_id: u16, rate: u32) -> QmResult<()> {
        if self.topology.num_hwfns > 1 {
            warn!("WFQ configuration is not supported for this device");
            return Err(QmError::unsupported(
                "vport WFQ on devices with multiple hardware functions",
            ));
        }

        let callbacks = self.callbacks()?;
        let min_pf_rate = self.link.min_pf_rate;
        let qm = self.qm_info_mut()?;

        if min_pf_rate == 0 {
            let data = qm.wfq_data.get_mut(vport_id as usize).ok_or_else(|| {
                QmError::invalid_config(format!("vport {} out of range", vport_id))
            })?;
            data.min_speed = rate;
            data.configured = true;
            self.stats.wfq_requests_accepted += 1;
            return Ok(());
        }

        if let Err(err) = qm.request_min_bandwidth(vport_id, rate, min_pf_rate) {
            warn!("validation failed while configuring min rate: {}", err);
            self.stats.wfq_requests_rejected += 1;
            return Err(err);
        }
        qm.apply_all(callbacks.as_ref(), min_pf_rate)?;
        self.stats.wfq_requests_accepted += 1;
        Ok(())
    }

    /// Applies a new line speed (0 when the link went down).
    ///
    /// Recomputes both PF rates from the stored percentages and
    /// re-validates the vport minimum rates.
    pub fn update_link(&mut self, line_speed: u32) -> QmResult<()> {
        self.link.line_speed = line_speed;

        if !self.link.is_up() {
            self.link.speed = 0;
            self.link.min_pf_rate = 0;
            debug!("pf {} link down", self.profile.pf_id);
            return Ok(());
        }

        self.apply_pf_max_bandwidth()?;

        if self.link.bandwidth_min == 0 {
            self.link.min_pf_rate = 0;
            return Ok(());
        }
        self.apply_pf_min_bandwidth()
    }

    /// Disables WFQ and forgets every vport minimum rate.
    pub fn clean_wfq_db(&mut self) -> QmResult<()> {
        let min_pf_rate = self.link.min_pf_rate;
        let callbacks = if min_pf_rate != 0 {
            Some(self.callbacks()?)
        } else {
            None
        };

        let qm = self.qm_info_mut()?;
        if let Some(callbacks) = callbacks {
            qm.disable_all(callbacks.as_ref())?;
        }
        qm.clear_wfq_data();
        Ok(())
    }
}
