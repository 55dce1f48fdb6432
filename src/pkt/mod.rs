//! 发送侧数据包模型
//!
//! `TxPacket` 模拟一个待发送的巨型包：一段线性区（以 MAC 头开头）加上若干个不连续的
//! 载荷块。`PacketSpec` 可以从 JSON 描述合成这样的包。

pub mod header;
mod packet;
mod spec;

pub use packet::{PayloadChunk, TxPacket};
pub use spec::{EtherKind, PacketSpec, PacketSpecError, TcpFlagSpec};
