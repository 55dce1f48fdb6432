//! TSO 分段演示
//!
//! 按命令行参数（或 JSON 描述）合成一个巨型 TCP 包，切成硬件分段并逐段打印。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;
use tracing::{debug, error, info};
use tso_rs::dma::{DmaSpec, SimDmaMapper};
use tso_rs::pkt::{EtherKind, PacketSpec, TcpFlagSpec};
use tso_rs::report::PacketReport;
use tso_rs::tso::inspect;
use tso_rs::tx::TsoTx;

#[derive(Debug, Parser)]
#[command(name = "tso-split", about = "把一个巨型 TCP 包切成 TSO 分段描述符")]
struct Args {
    /// JSON 包描述；给出时忽略下面的包参数
    #[arg(long)]
    spec: Option<PathBuf>,

    #[arg(long, default_value_t = 1460)]
    mss: u32,
    /// 头部之后仍在线性区的载荷字节数
    #[arg(long, default_value_t = 0)]
    linear_payload: usize,
    /// 载荷块长度（可重复）
    #[arg(long = "chunk")]
    chunks: Vec<usize>,
    /// ipv4 / ipv6 / arp
    #[arg(long, default_value = "ipv4")]
    ether_type: String,
    /// 802.1Q VLAN ID（可重复）
    #[arg(long = "vlan")]
    vlans: Vec<u16>,
    /// 覆盖 IP 协议号（例如 17 = UDP）
    #[arg(long)]
    ip_proto: Option<u8>,
    #[arg(long, default_value_t = 0)]
    seq: u32,
    #[arg(long, default_value_t = 0)]
    ip_id: u16,
    #[arg(long)]
    fin: bool,
    #[arg(long)]
    psh: bool,

    /// 前 n 次 DMA 映射成功，之后失败
    #[arg(long)]
    fail_map_after: Option<u64>,
    #[arg(long, default_value_t = 64)]
    pool_size: usize,
    /// 输出 JSON 报告
    #[arg(long)]
    json: Option<PathBuf>,
}

/// `--spec` 文件：包描述加上可选的 DMA 配置
#[derive(Debug, Deserialize)]
struct SplitFile {
    #[serde(flatten)]
    packet: PacketSpec,
    #[serde(default)]
    dma: DmaSpec,
}

fn parse_ether(s: &str) -> Result<EtherKind, String> {
    match s {
        "ipv4" => Ok(EtherKind::Ipv4),
        "ipv6" => Ok(EtherKind::Ipv6),
        "arp" => Ok(EtherKind::Arp),
        other => Err(format!("unknown ether type {other:?}")),
    }
}

fn load(args: &Args) -> Result<(PacketSpec, DmaSpec), String> {
    let (spec, mut dma) = if let Some(path) = &args.spec {
        let raw = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
        let file: SplitFile = serde_json::from_str(&raw).map_err(|e| format!("parse {}: {e}", path.display()))?;
        (file.packet, file.dma)
    } else {
        let spec = PacketSpec {
            ether: parse_ether(&args.ether_type)?,
            vlan_tags: args.vlans.clone(),
            ip_proto: args.ip_proto,
            ip_id: args.ip_id,
            tcp_seq: args.seq,
            flags: TcpFlagSpec {
                fin: args.fin,
                psh: args.psh,
                ack: true,
                ..TcpFlagSpec::default()
            },
            linear_payload: args.linear_payload,
            chunks: args.chunks.clone(),
            mss: args.mss,
            ..PacketSpec::default()
        };
        (spec, DmaSpec::default())
    };
    spec.validate().map_err(|e| e.to_string())?;
    if args.fail_map_after.is_some() {
        dma.fail_after = args.fail_map_after;
    }
    Ok((spec, dma))
}

fn run(args: &Args) -> Result<(), String> {
    let (spec, dma) = load(args)?;
    let pkt = spec.build();
    debug!(len = pkt.len(), header_len = spec.header_len(), "合成数据包");

    let mut tx = TsoTx::new(args.pool_size, SimDmaMapper::new(dma));
    let prepared = tx.prepare(&pkt).map_err(|e| e.to_string())?;

    if !prepared.is_tso {
        println!("not_tso len={}", pkt.len());
        return Ok(());
    }

    let common = inspect(&pkt).map_err(|e| e.to_string())?;
    let report = PacketReport::new(&common, pkt.gso_size(), &prepared.segments);
    println!("segments={} payload={}", report.segments.len(), report.payload_len);
    for seg in &report.segments {
        let ip_id = seg.ip_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "seg i={} seq={} ip_id={} len={} frags={} fin={}",
            seg.index,
            seg.tcp_seq,
            ip_id,
            seg.payload_len,
            seg.frags.len(),
            seg.fin
        );
    }

    if let Some(path) = &args.json {
        let raw = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        fs::write(path, raw).map_err(|e| format!("write {}: {e}", path.display()))?;
        info!(path = %path.display(), "写出 JSON 报告");
    }

    tx.complete(prepared).map_err(|e| e.to_string())?;
    println!("outstanding_mappings={}", tx.mapper().outstanding());
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
