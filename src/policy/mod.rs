//! Replacement policies.
//!
//! | Module       | Policies                                     | Victim selection          |
//! |--------------|----------------------------------------------|---------------------------|
//! | [`frequent`] | LFU, MFU, cost-boosted LFU                   | O(1) frequency ring       |
//! | [`heap`]     | LFU with frequency aging                     | lazy min-heap             |
//! | [`sampled`]  | FIFO, LRU, MRU, LFU, MFU, random, hyperbolic | rule over a random sample |
//! | [`adaptive`] | LeCaR                                        | weighted LRU/LFU choice   |

pub mod adaptive;
pub mod frequent;
pub mod heap;
pub mod sampled;
