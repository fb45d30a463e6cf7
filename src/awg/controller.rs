// SPDX-License-Identifier: Apache-2.0 OR MIT

//! High-level control of the 16 AWGs behind one instrument.
//!
//! Every operation that touches the shared master-control register goes
//! through [`AwgController::critical_section`]: acquire the inter-process
//! lock, select the target AWGs' bits, run the operation, then deselect —
//! even if the operation failed, so a caller error never leaves other
//! processes blocked behind a stuck selection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::access::{ParamRegistryAccessor, RegisterAccessor, WaveRamAccessor};
use crate::awg::types::{AwgId, WaveChunk, WaveSequence};
use crate::config::Config;
use crate::error::{AwgFault, Error, Result};
use crate::lock::InterProcessLock;
use crate::logging::{self, Level, Logger};
use crate::memory_map;
use crate::transport::Transport;
use crate::util::{self, ErrOrTimeout};

/// Where a programmed wave sequence is written: either an AWG's live
/// parameters, which take effect the next time it starts, or a slot in its
/// wave-sequence registry for later recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamDest {
    Live,
    Registry(u16),
}

/// Host-side handle for the 16 AWGs of one instrument.
pub struct AwgController {
    register: RegisterAccessor,
    waveram: WaveRamAccessor,
    paramreg: ParamRegistryAccessor,
    lock: InterProcessLock,
    loggers: Vec<Arc<dyn Logger>>,
    config: Config,
}

impl AwgController {
    /// Minimum time the reset line must be held and then held clear.
    const RESET_PULSE_WIDTH: Duration = Duration::from_micros(10);
    /// How long `start_awgs` waits for `STATUS_READY` before giving up.
    const PREPARE_TIMEOUT: Duration = Duration::from_secs(5);
    /// How long `terminate_awgs` waits for `STATUS_BUSY` to clear.
    const TERMINATE_TIMEOUT: Duration = Duration::from_secs(3);

    /// `reg_transport` carries register-space traffic, `wave_transport`
    /// wave-RAM/registry traffic — they may be the same transport if the
    /// instrument multiplexes both on one port, or distinct ones bound to
    /// the two ports an instrument normally assigns (see
    /// [`crate::config::InstrumentAddr`]).
    pub fn new(
        reg_transport: Arc<dyn Transport>,
        wave_transport: Arc<dyn Transport>,
        canonical_ip: &str,
        config: Config,
    ) -> Self {
        Self {
            register: RegisterAccessor::new(reg_transport, config.mtu),
            waveram: WaveRamAccessor::new(wave_transport.clone(), config.mtu),
            paramreg: ParamRegistryAccessor::new(wave_transport, config.mtu),
            lock: InterProcessLock::for_awg_ip(canonical_ip),
            loggers: Vec::new(),
            config,
        }
    }

    /// Register a sink for operation-level notices.
    pub fn add_logger(&mut self, logger: Arc<dyn Logger>) {
        self.loggers.push(logger);
    }

    fn log(&self, level: Level, message: &str) {
        logging::emit(&self.loggers, level, message);
    }

    // =========================================================================
    // Master-control critical sections
    // =========================================================================

    fn select_mask(ids: &[AwgId]) -> u32 {
        ids.iter()
            .fold(0u32, |mask, id| mask | (1 << memory_map::awg_ctrl_target_sel_bit(id.get())))
    }

    /// Acquire the lock, then run `action` with the target-select mask for
    /// `ids` already computed; always deselects afterward, even on error. If
    /// both `action` and the deselect write fail, the error from `action`
    /// wins.
    fn critical_section<T>(
        &self,
        ids: &[AwgId],
        action: impl FnOnce(u32) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.lock.acquire().map_err(Error::from)?;
        let mask = Self::select_mask(ids);
        let result = action(mask);
        let deselect = self
            .register
            .write(memory_map::AWG_MASTER_CTRL_REG_ADDR, 0, 0)
            .map_err(Error::from);
        match result {
            Ok(v) => deselect.map(|()| v),
            Err(e) => Err(e),
        }
    }

    fn pulse(&self, ids: &[AwgId], bit: u32) -> Result<()> {
        self.critical_section(ids, |mask| {
            self.register
                .write(memory_map::AWG_MASTER_CTRL_REG_ADDR, 0, mask | (1 << bit))
                .map_err(Into::into)
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bring `ids` to a known idle state: clear each AWG's control register,
    /// and install a null (all-zero, 64-sample) wave sequence so a start
    /// before any real sequence is programmed does something well-defined.
    /// Deliberately does not call [`Self::reset_awgs`]: resetting here would
    /// also clear timing/version state a caller may want to inspect before
    /// its first real sequence is programmed.
    pub fn initialize(&self, ids: &[AwgId]) -> Result<()> {
        self.critical_section(ids, |_mask| Ok(()))?;
        for id in ids {
            self.register.write(memory_map::awg_reg_base(id.get()), memory_map::AWG_REG_OFF_CTRL, 0)?;
        }
        let null_chunk = WaveChunk::new(vec![(0, 0); memory_map::WAVE_BLOCK_SAMPLES as usize], 0, 1)
            .expect("a 64-sample all-zero chunk is always valid");
        let null_seq = WaveSequence::new(0, 1, vec![null_chunk])
            .expect("a single 64-sample chunk is always within the sequence size limit");
        for id in ids {
            self.set_wave_startable_block_timing(*id, 1)?;
            self.set_wave_sequence(*id, &null_seq)?;
        }
        self.log(Level::Info, &format!("initialized awgs {:?}", ids_as_u32(ids)));
        Ok(())
    }

    /// Raise `CTRL_RESET`, hold it, then clear it — both edges separated by
    /// the minimum pulse width the reset line requires.
    pub fn reset_awgs(&self, ids: &[AwgId]) -> Result<()> {
        self.critical_section(ids, |mask| {
            self.register.write(
                memory_map::AWG_MASTER_CTRL_REG_ADDR,
                0,
                mask | (1 << memory_map::AWG_CTRL_RESET_BIT),
            )?;
            std::thread::sleep(Self::RESET_PULSE_WIDTH);
            self.register.write(memory_map::AWG_MASTER_CTRL_REG_ADDR, 0, mask)?;
            std::thread::sleep(Self::RESET_PULSE_WIDTH);
            Ok(())
        })
    }

    pub fn clear_awg_stop_flags(&self, ids: &[AwgId]) -> Result<()> {
        self.pulse(ids, memory_map::AWG_CTRL_DONE_CLR_BIT)
    }

    /// Set each AWG's `CTRL_TERMINATE` bit, wait for it to go idle, then
    /// clear the bit — each AWG's control register is private to it, so
    /// this runs outside the master-control critical section.
    pub fn terminate_awgs(&self, ids: &[AwgId]) -> Result<()> {
        for id in ids {
            self.register.write_bits(
                memory_map::awg_reg_base(id.get()),
                memory_map::AWG_REG_OFF_CTRL,
                memory_map::AWG_CTRL_TERMINATE_BIT,
                1,
                1,
            )?;
            self.wait_for_awg_idle(*id, Self::TERMINATE_TIMEOUT)?;
            self.register.write_bits(
                memory_map::awg_reg_base(id.get()),
                memory_map::AWG_REG_OFF_CTRL,
                memory_map::AWG_CTRL_TERMINATE_BIT,
                1,
                0,
            )?;
        }
        Ok(())
    }

    /// Pulse `CTRL_PREPARE`, wait for every AWG to report `STATUS_READY`,
    /// clear `CTRL_PREPARE`, then pulse `CTRL_START` so `ids` begin on the
    /// same cycle.
    pub fn start_awgs(&self, ids: &[AwgId]) -> Result<()> {
        self.critical_section(ids, |mask| {
            self.register.write(
                memory_map::AWG_MASTER_CTRL_REG_ADDR,
                0,
                mask | (1 << memory_map::AWG_CTRL_PREPARE_BIT),
            )?;
            self.wait_for_awgs_ready(ids, Self::PREPARE_TIMEOUT)?;
            self.register.write(memory_map::AWG_MASTER_CTRL_REG_ADDR, 0, mask)?;

            self.register.write(
                memory_map::AWG_MASTER_CTRL_REG_ADDR,
                0,
                mask | (1 << memory_map::AWG_CTRL_START_BIT),
            )?;
            self.register
                .write(memory_map::AWG_MASTER_CTRL_REG_ADDR, 0, mask)
                .map_err(Into::into)
        })
    }

    /// Block until every AWG in `ids` reports `STATUS_DONE`, or `timeout`
    /// elapses.
    pub fn wait_for_awgs_to_stop(&self, ids: &[AwgId], timeout: Duration) -> Result<()> {
        let result: std::result::Result<(), ErrOrTimeout<Error>> = util::poll_until_empty(
            "wait_for_awgs_to_stop",
            timeout,
            self.config.poll_interval,
            || {
                let mut pending = Vec::new();
                for id in ids {
                    let done = self.register.read_bits(
                        memory_map::awg_reg_base(id.get()),
                        memory_map::AWG_REG_OFF_STATUS,
                        memory_map::AWG_STATUS_DONE_BIT,
                        1,
                    )?;
                    if done == 0 {
                        pending.push(*id);
                    }
                }
                Ok(pending)
            },
        );
        unwrap_poll(result)
    }

    /// Block until every AWG in `ids` reports `STATUS_READY`, or `timeout`
    /// elapses. Called from inside [`Self::start_awgs`]'s critical section,
    /// so it reads registers directly rather than re-acquiring the lock.
    fn wait_for_awgs_ready(&self, ids: &[AwgId], timeout: Duration) -> Result<()> {
        let result: std::result::Result<(), ErrOrTimeout<Error>> = util::poll_until_empty(
            "wait_for_awgs_ready",
            timeout,
            self.config.poll_interval,
            || {
                let mut pending = Vec::new();
                for id in ids {
                    let ready = self.register.read_bits(
                        memory_map::awg_reg_base(id.get()),
                        memory_map::AWG_REG_OFF_STATUS,
                        memory_map::AWG_STATUS_READY_BIT,
                        1,
                    )?;
                    if ready == 0 {
                        pending.push(*id);
                    }
                }
                Ok(pending)
            },
        );
        unwrap_poll(result)
    }

    /// Block until `id` reports `STATUS_BUSY` clear, or `timeout` elapses.
    fn wait_for_awg_idle(&self, id: AwgId, timeout: Duration) -> Result<()> {
        let result: std::result::Result<(), ErrOrTimeout<Error>> = util::poll_until_empty(
            "wait_for_awg_idle",
            timeout,
            self.config.poll_interval,
            || {
                let busy = self.register.read_bits(
                    memory_map::awg_reg_base(id.get()),
                    memory_map::AWG_REG_OFF_STATUS,
                    memory_map::AWG_STATUS_BUSY_BIT,
                    1,
                )?;
                Ok(if busy != 0 { vec![id] } else { vec![] })
            },
        );
        unwrap_poll(result)
    }

    // =========================================================================
    // Wave sequences
    // =========================================================================

    /// Program `seq` as AWG `id`'s live wave sequence, taking effect the
    /// next time it starts.
    pub fn set_wave_sequence(&self, id: AwgId, seq: &WaveSequence) -> Result<()> {
        self.program_sequence(id, ParamDest::Live, seq)
    }

    /// Program `seq` into registry `entry` of AWG `id`'s wave-sequence
    /// registry, for later recall without re-sending wave-RAM contents.
    pub fn register_wave_sequence(&self, id: AwgId, entry: u16, seq: &WaveSequence) -> Result<()> {
        self.program_sequence(id, ParamDest::Registry(entry), seq)
    }

    /// Batch form of [`Self::register_wave_sequence`].
    pub fn register_wave_sequences(&self, id: AwgId, entries: &[(u16, WaveSequence)]) -> Result<()> {
        for (entry, seq) in entries {
            self.register_wave_sequence(id, *entry, seq)?;
        }
        Ok(())
    }

    fn program_sequence(&self, id: AwgId, dest: ParamDest, seq: &WaveSequence) -> Result<()> {
        let k = id.get();
        if seq.chunks().len() as u64 > memory_map::AWG_REG_MAX_CHUNKS {
            return Err(Error::from(crate::error::ValidationError::new(
                "program_sequence",
                format!(
                    "sequence has {} chunks, exceeding the {}-chunk table",
                    seq.chunks().len(),
                    memory_map::AWG_REG_MAX_CHUNKS
                ),
            )));
        }

        let mut addr = memory_map::awg_wave_base(k);
        let mut chunk_entries = Vec::with_capacity(seq.chunks().len() * 4);
        for chunk in seq.chunks() {
            let bytes = chunk.serialize_samples();
            self.waveram.write(addr, &bytes)?;
            chunk_entries.push((addr >> 4) as u32);
            chunk_entries.push(chunk.num_wave_part_words());
            chunk_entries.push(chunk.num_blank_words());
            chunk_entries.push(chunk.num_repeats());
            addr += chunk.ram_byte_len();
        }

        self.write_word(k, dest, memory_map::AWG_REG_OFF_NUM_WAIT_WORDS, seq.num_wait_words())?;
        self.write_word(k, dest, memory_map::AWG_REG_OFF_NUM_REPEATS, seq.num_repeats())?;
        self.write_word(
            k,
            dest,
            memory_map::AWG_REG_OFF_NUM_CHUNKS,
            seq.chunks().len() as u32,
        )?;
        self.write_words(k, dest, memory_map::AWG_REG_OFF_CHUNK_TABLE, &chunk_entries)?;
        Ok(())
    }

    fn write_word(&self, k: u32, dest: ParamDest, offset: u64, value: u32) -> Result<()> {
        match dest {
            ParamDest::Live => self
                .register
                .write(memory_map::awg_reg_base(k), offset, value)
                .map_err(Into::into),
            ParamDest::Registry(entry) => self
                .paramreg
                .write(memory_map::wave_seq_registry_addr(k, entry as u32) + offset, value)
                .map_err(Into::into),
        }
    }

    fn write_words(&self, k: u32, dest: ParamDest, offset: u64, values: &[u32]) -> Result<()> {
        match dest {
            ParamDest::Live => self
                .register
                .multi_write(memory_map::awg_reg_base(k), offset, values)
                .map_err(Into::into),
            ParamDest::Registry(entry) => self
                .paramreg
                .multi_write(memory_map::wave_seq_registry_addr(k, entry as u32) + offset, values)
                .map_err(Into::into),
        }
    }

    // =========================================================================
    // Timing, faults, and version
    // =========================================================================

    pub fn set_wave_startable_block_timing(&self, id: AwgId, interval_blocks: u32) -> Result<()> {
        self.register
            .write(
                memory_map::awg_reg_base(id.get()),
                memory_map::AWG_REG_OFF_BLOCK_STARTABLE_INTERVAL,
                interval_blocks,
            )
            .map_err(Into::into)
    }

    pub fn wave_startable_block_timing(&self, id: AwgId) -> Result<u32> {
        self.register
            .read(
                memory_map::awg_reg_base(id.get()),
                memory_map::AWG_REG_OFF_BLOCK_STARTABLE_INTERVAL,
            )
            .map_err(Into::into)
    }

    /// Faults latched since the last `clear_awg_stop_flags`, per AWG.
    /// AWGs with no latched fault are omitted from the result.
    pub fn check_err(&self, ids: &[AwgId]) -> Result<HashMap<AwgId, Vec<AwgFault>>> {
        let mut out = HashMap::new();
        for id in ids {
            let bits = self
                .register
                .read(memory_map::awg_reg_base(id.get()), memory_map::AWG_REG_OFF_ERR)?;
            let mut faults = Vec::new();
            if bits & (1 << memory_map::AWG_ERR_READ_BIT) != 0 {
                faults.push(AwgFault::MemRead);
            }
            if bits & (1 << memory_map::AWG_ERR_SAMPLE_SHORTAGE_BIT) != 0 {
                faults.push(AwgFault::SampleShortage);
            }
            if !faults.is_empty() {
                out.insert(*id, faults);
            }
        }
        Ok(out)
    }

    /// Hardware version word for AWG `id`, as `(major, minor, patch)`. The
    /// bit layout of the version register is this crate's own convention.
    pub fn version(&self, id: AwgId) -> Result<(u8, u8, u16)> {
        let raw = self
            .register
            .read(memory_map::awg_reg_base(id.get()), memory_map::AWG_REG_OFF_VERSION)?;
        let major = (raw >> 24) as u8;
        let minor = (raw >> 16) as u8;
        let patch = (raw & 0xFFFF) as u16;
        Ok((major, minor, patch))
    }
}

fn unwrap_poll<T>(r: std::result::Result<T, ErrOrTimeout<Error>>) -> Result<T> {
    match r {
        Ok(v) => Ok(v),
        Err(ErrOrTimeout::Other(e)) => Err(e),
        Err(ErrOrTimeout::Timeout(t)) => Err(t.into()),
    }
}

fn ids_as_u32(ids: &[AwgId]) -> Vec<u32> {
    ids.iter().map(|id| id.get()).collect()
}
