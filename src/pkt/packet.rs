//! 数据包类型

/// 线性区之外的一段载荷内存。
#[derive(Debug, Clone)]
pub struct PayloadChunk {
    data: Box<[u8]>,
}

impl PayloadChunk {
    pub fn new(data: impl Into<Box<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    /// CPU 可见的起始地址
    pub fn vaddr(&self) -> usize {
        self.data.as_ptr() as usize
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// 待分段的发送包
#[derive(Debug, Clone)]
pub struct TxPacket {
    linear: Box<[u8]>,
    chunks: Vec<PayloadChunk>,
    /// 协商得到的 MSS（0 表示不做 TSO）
    gso_size: u32,
}

impl TxPacket {
    pub fn new(linear: impl Into<Box<[u8]>>, chunks: Vec<PayloadChunk>, gso_size: u32) -> Self {
        Self {
            linear: linear.into(),
            chunks,
            gso_size,
        }
    }

    /// 整包长度（线性区 + 全部载荷块）
    pub fn len(&self) -> usize {
        self.linear.len() + self.chunks.iter().map(PayloadChunk::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 线性区（MAC 头位于偏移 0）
    pub fn linear(&self) -> &[u8] {
        &self.linear
    }

    pub fn linear_vaddr(&self) -> usize {
        self.linear.as_ptr() as usize
    }

    pub fn chunks(&self) -> &[PayloadChunk] {
        &self.chunks
    }

    pub fn gso_size(&self) -> u32 {
        self.gso_size
    }

    pub fn set_gso_size(&mut self, gso_size: u32) {
        self.gso_size = gso_size;
    }

    /// 是否需要做 TSO 分段
    pub fn is_tso(&self) -> bool {
        self.gso_size > 0
    }

    /// 按线性区、载荷块的顺序读出 `[offset, offset + len)`，用于校验分段结果。
    pub fn copy_range(&self, offset: usize, len: usize) -> Option<Vec<u8>> {
        let end = offset.checked_add(len)?;
        if end > self.len() {
            return None;
        }
        let mut out = Vec::with_capacity(len);
        let mut base = 0;
        for region in std::iter::once(&self.linear[..]).chain(self.chunks.iter().map(|c| c.bytes())) {
            let r_end = base + region.len();
            if r_end > offset && base < end {
                let lo = offset.max(base) - base;
                let hi = end.min(r_end) - base;
                out.extend_from_slice(&region[lo..hi]);
            }
            base = r_end;
        }
        Some(out)
    }
}
