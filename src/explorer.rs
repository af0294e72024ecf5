//! Explorer links
//!
//! A link is a pure function of the signature and the cluster, so it can be
//! re-derived at any time without holding on to it.

use crate::config::Cluster;
use solana_sdk::signature::Signature;
use std::str::FromStr;
use url::Url;

pub const EXPLORER_BASE: &str = "https://explorer.solana.com";

pub fn explorer_link(signature: &Signature, cluster: Cluster) -> String {
    format!(
        "{}/tx/{}?cluster={}",
        EXPLORER_BASE,
        signature,
        cluster.explorer_tag()
    )
}

/// Recover the signature and cluster from a link built by [`explorer_link`]
pub fn parse_explorer_link(link: &str) -> Option<(Signature, Cluster)> {
    let url = Url::parse(link).ok()?;
    let base = Url::parse(EXPLORER_BASE).ok()?;
    if url.scheme() != base.scheme() || url.host_str() != base.host_str() {
        return None;
    }

    let mut segments = url.path_segments()?;
    if segments.next()? != "tx" {
        return None;
    }
    let signature = Signature::from_str(segments.next()?).ok()?;
    if segments.next().is_some() {
        return None;
    }

    let cluster = url
        .query_pairs()
        .find(|(key, _)| key == "cluster")
        .and_then(|(_, value)| Cluster::from_explorer_tag(&value))?;

    Some((signature, cluster))
}
