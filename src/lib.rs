pub mod dma;
pub mod pkt;
pub mod report;
pub mod tso;
pub mod tx;

#[cfg(test)]
mod test;
