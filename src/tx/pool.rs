//! 预分配的分段描述符池
//!
//! 启动时一次性分配 `pool_size` 个描述符放进空闲表；发送时按段数整体申请，
//! 发送完成后整体归还。

use tracing::warn;

use crate::tso::{SegmentDescriptor, TsoError};

#[derive(Debug)]
pub struct SegmentPool {
    free: Vec<SegmentDescriptor>,
    pool_size: usize,
}

impl SegmentPool {
    pub fn new(pool_size: usize) -> Self {
        Self {
            free: vec![SegmentDescriptor::default(); pool_size],
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    /// 取出一个描述符
    pub fn alloc(&mut self) -> Option<SegmentDescriptor> {
        self.free.pop()
    }

    /// 归还一个描述符（归还前清零）
    pub fn free(&mut self, mut seg: SegmentDescriptor) {
        seg.reset();
        self.free.push(seg);
    }

    /// 申请 `n` 个描述符；不够时已取出的全部归还，不留半截链。
    pub fn alloc_chain(&mut self, n: usize) -> Result<Vec<SegmentDescriptor>, TsoError> {
        let mut chain = Vec::with_capacity(n);
        while chain.len() < n {
            match self.alloc() {
                Some(seg) => chain.push(seg),
                None => {
                    warn!(requested = n, got = chain.len(), "TSO 描述符申请失败");
                    let available = chain.len();
                    self.free_chain(chain);
                    return Err(TsoError::PoolAllocFailed { requested: n, available });
                }
            }
        }
        Ok(chain)
    }

    pub fn free_chain(&mut self, chain: Vec<SegmentDescriptor>) {
        for seg in chain {
            self.free(seg);
        }
    }
}
