//! 软件模拟的 IOMMU
//!
//! 总线地址按 bump 方式分配（默认放在 4 GiB 以上，便于覆盖高/低位拆分），
//! 同时记录所有存活映射，测试可据此检查失败路径是否泄漏映射。

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::{BusAddr, DmaDirection, DmaError, DmaMapper};

/// 每个映射按此粒度对齐
const MAP_ALIGN: u64 = 64;

pub const DEFAULT_BUS_BASE: u64 = 0x1_0000_0000;

fn default_base() -> u64 {
    DEFAULT_BUS_BASE
}

/// 模拟 IOMMU 的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmaSpec {
    /// 第一个总线地址
    #[serde(default = "default_base")]
    pub base: u64,
    /// 前 n 次 map 成功，之后全部失败（用于故障注入）
    #[serde(default)]
    pub fail_after: Option<u64>,
}

impl Default for DmaSpec {
    fn default() -> Self {
        Self {
            base: DEFAULT_BUS_BASE,
            fail_after: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LiveMapping {
    vaddr: usize,
    len: usize,
}

#[derive(Debug)]
struct Ledger {
    next: u64,
    live: HashMap<u64, LiveMapping>,
}

#[derive(Debug)]
pub struct SimDmaMapper {
    fail_after: Option<u64>,
    ledger: Mutex<Ledger>,
    map_calls: AtomicU64,
    unmap_calls: AtomicU64,
}

impl Default for SimDmaMapper {
    fn default() -> Self {
        Self::new(DmaSpec::default())
    }
}

impl SimDmaMapper {
    pub fn new(spec: DmaSpec) -> Self {
        Self {
            fail_after: spec.fail_after,
            ledger: Mutex::new(Ledger {
                next: spec.base,
                live: HashMap::new(),
            }),
            map_calls: AtomicU64::new(0),
            unmap_calls: AtomicU64::new(0),
        }
    }

    /// 前 `n` 次 map 成功，之后失败
    pub fn failing_after(n: u64) -> Self {
        Self::new(DmaSpec {
            fail_after: Some(n),
            ..DmaSpec::default()
        })
    }

    /// 累计 map 调用次数（包括失败的调用）
    pub fn map_calls(&self) -> u64 {
        self.map_calls.load(Ordering::Relaxed)
    }

    pub fn unmap_calls(&self) -> u64 {
        self.unmap_calls.load(Ordering::Relaxed)
    }

    /// 当前仍然存活的映射数
    pub fn outstanding(&self) -> usize {
        self.ledger.lock().map(|l| l.live.len()).unwrap_or(0)
    }

    /// 查询某个总线地址对应的 (vaddr, len)
    pub fn lookup(&self, bus: BusAddr) -> Option<(usize, usize)> {
        let ledger = self.ledger.lock().ok()?;
        ledger.live.get(&bus.0).map(|m| (m.vaddr, m.len))
    }
}

impl DmaMapper for SimDmaMapper {
    fn map(&self, vaddr: usize, len: usize, _dir: DmaDirection) -> Result<BusAddr, DmaError> {
        let call = self.map_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(limit) = self.fail_after {
            if call > limit {
                warn!(call, limit, "模拟 DMA 映射失败");
                return Err(DmaError::Injected { call });
            }
        }

        let mut ledger = self.ledger.lock().map_err(|_| DmaError::Exhausted)?;
        let span = (len as u64).max(1).div_ceil(MAP_ALIGN) * MAP_ALIGN;
        let bus = ledger.next;
        ledger.next = bus.checked_add(span).ok_or(DmaError::Exhausted)?;
        ledger.live.insert(bus, LiveMapping { vaddr, len });
        trace!(vaddr, len, bus, "map");
        Ok(BusAddr(bus))
    }

    fn unmap(&self, bus: BusAddr, len: usize, _dir: DmaDirection) -> Result<(), DmaError> {
        self.unmap_calls.fetch_add(1, Ordering::Relaxed);
        let mut ledger = self.ledger.lock().map_err(|_| DmaError::UnknownMapping(bus.0))?;
        match ledger.live.remove(&bus.0) {
            Some(m) if m.len == len => Ok(()),
            Some(m) => {
                // 长度不符时仍然释放，但报告给调用方
                warn!(bus = bus.0, mapped = m.len, len, "unmap 长度与 map 不一致");
                Err(DmaError::UnknownMapping(bus.0))
            }
            None => Err(DmaError::UnknownMapping(bus.0)),
        }
    }
}
