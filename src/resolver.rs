//! Turns pod listing text into a [`ServiceIndex`].
//!
//! Pod names are expected to follow `[env-][namespace-]<service>-<hash>-<suffix>`.
//! Rows that are not running or don't split into at least three dash-separated
//! parts are left out of the index.

use tracing::{trace, warn};

use crate::models::{EnvironmentTag, InstanceDescriptor, PodRecord, ServiceIndex};

/// Column positions from the listing's header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingHeader {
    name: usize,
    namespace: Option<usize>,
    status: Option<usize>,
}

impl ListingHeader {
    /// Returns `None` when the header has no `NAME` column.
    pub fn parse(line: &str) -> Option<Self> {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let position = |label: &str| columns.iter().position(|c| *c == label);
        Some(Self {
            name: position("NAME")?,
            namespace: position("NAMESPACE"),
            status: position("STATUS"),
        })
    }

    pub fn record<'a>(&self, line: &'a str) -> Option<PodRecord<'a>> {
        let cells: Vec<&str> = line.split_whitespace().collect();
        Some(PodRecord {
            name: cells.get(self.name).copied()?,
            namespace: self.namespace.and_then(|i| cells.get(i).copied()),
            status: self.status.and_then(|i| cells.get(i).copied()),
        })
    }

    /// Without a `STATUS` column every row counts as running. With one, a
    /// row must say `Running`; a missing cell does not.
    pub fn is_running(&self, record: &PodRecord<'_>) -> bool {
        self.status.is_none() || record.status == Some("Running")
    }
}

/// Builds the service index for one pod listing.
///
/// With `namespace_filter` set every row is attributed to that namespace and
/// any `NAMESPACE` column is ignored.
pub fn resolve(listing: &str, namespace_filter: Option<&str>) -> ServiceIndex {
    let mut index = ServiceIndex::default();
    let mut lines = listing.lines().filter(|l| !l.trim().is_empty());

    let Some(header) = lines.next() else {
        return index;
    };
    let Some(header) = ListingHeader::parse(header) else {
        warn!(header, "pod listing has no NAME column");
        return index;
    };

    for record in lines.filter_map(|line| header.record(line)) {
        if !header.is_running(&record) {
            trace!(pod = record.name, status = ?record.status, "skipping pod that is not running");
            continue;
        }
        let namespace = namespace_filter.or(record.namespace).unwrap_or_default();
        match resolve_record(record.name, namespace) {
            Some((service, tag, instance)) => index.insert(service, tag, instance),
            None => trace!(pod = record.name, "skipping pod outside the naming convention"),
        }
    }
    index
}

fn resolve_record(pod_name: &str, namespace: &str) -> Option<(String, EnvironmentTag, InstanceDescriptor)> {
    let tag = EnvironmentTag::classify(pod_name);

    let parts: Vec<&str> = pod_name.split('-').collect();
    if parts.len() < 3 {
        return None;
    }
    let (service, suffix) = parts.split_at(parts.len() - 2);
    let service_name = service.join("-");
    let id = suffix.join("-");

    let short = short_service_name(&service_name, tag, namespace).to_string();
    Some((short, tag, InstanceDescriptor::new(id, namespace, service_name)))
}

/// Strips the environment prefix, then a leading `"{namespace}-"`, each once.
fn short_service_name<'a>(service_name: &'a str, tag: EnvironmentTag, namespace: &str) -> &'a str {
    let name = tag.strip(service_name);
    if namespace.is_empty() {
        return name;
    }
    name.strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_filter_applies_without_status_column() {
        let listing = "NAME\nteamA-orders-7f9c8-x2k1\n";
        let index = resolve(listing, Some("teamA"));

        assert_eq!(index.services().collect::<Vec<_>>(), ["orders"]);
        assert_eq!(
            index.instance("orders", EnvironmentTag::Default),
            Some(&InstanceDescriptor::new("7f9c8-x2k1", "teamA", "teamA-orders"))
        );
    }

    #[test]
    fn namespace_column_used_without_filter() {
        let listing = "\
NAMESPACE   NAME                     READY   STATUS    RESTARTS   AGE
payments    dev-billing-abc12-99zz   1/1     Running   0          3d
";
        let index = resolve(listing, None);

        assert_eq!(
            index.instance("billing", EnvironmentTag::Dev),
            Some(&InstanceDescriptor::new("abc12-99zz", "payments", "dev-billing"))
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn filter_overrides_namespace_column() {
        let listing = "NAMESPACE NAME STATUS\nother shop-cart-1a-2b Running\n";
        let index = resolve(listing, Some("shop"));

        let instance = index.instance("cart", EnvironmentTag::Default).unwrap();
        assert_eq!(instance.namespace(), "shop");
        assert_eq!(instance.service_name(), "shop-cart");
    }

    #[test]
    fn rows_not_running_are_skipped() {
        let listing = "\
NAME                    READY   STATUS             RESTARTS   AGE
api-5d8f7-aaaaa         1/1     Running            0          1h
worker-5d8f7-bbbbb      0/1     CrashLoopBackOff   7          1h
cron-27a1b-ccccc        0/1     Completed          0          2h
old-api-5d8f7-ddddd     1/1     Terminating        0          5h
";
        let index = resolve(listing, Some("ns"));

        assert_eq!(index.services().collect::<Vec<_>>(), ["api"]);
        for (_, _, instance) in index.iter() {
            assert_eq!(instance.pod_name(), "api-5d8f7-aaaaa");
        }
    }

    #[test]
    fn names_with_fewer_than_three_parts_are_skipped() {
        let listing = "NAME STATUS\ncoredns Running\netcd-master Running\nweb-a-b Running\n";
        let index = resolve(listing, None);

        assert_eq!(index.services().collect::<Vec<_>>(), ["web"]);
        let instance = index.instance("web", EnvironmentTag::Default).unwrap();
        assert_eq!(instance.namespace(), "");
        assert_eq!(instance.id(), "a-b");
    }

    #[test]
    fn env_prefix_only_three_parts_keeps_prefix_as_name() {
        let index = resolve("NAME\ndev-1a2b-3c4d\n", None);
        let instance = index.instance("dev", EnvironmentTag::Dev).unwrap();
        assert_eq!(instance.service_name(), "dev");
    }

    #[test]
    fn every_environment_is_classified() {
        let listing = "\
NAMESPACE NAME STATUS
shop dev-cart-1-a Running
shop qa-cart-2-b Running
shop stg-cart-3-c Running
shop prod-cart-4-d Running
shop cart-5-e Running
";
        let index = resolve(listing, None);

        assert_eq!(
            index.environments("cart"),
            [
                EnvironmentTag::Dev,
                EnvironmentTag::Qa,
                EnvironmentTag::Stg,
                EnvironmentTag::Prod,
                EnvironmentTag::Default,
            ]
        );
        assert_eq!(index.instance("cart", EnvironmentTag::Stg).unwrap().id(), "3-c");
    }

    #[test]
    fn env_and_namespace_prefixes_both_stripped() {
        let index = resolve("NAME\nprod-teamA-orders-7f9c8-x2k1\n", Some("teamA"));
        let instance = index.instance("orders", EnvironmentTag::Prod).unwrap();
        assert_eq!(instance.service_name(), "prod-teamA-orders");
    }

    #[test]
    fn namespace_stripped_only_at_front() {
        let index = resolve("NAME\norders-teamA-api-1a-2b\nteamA-teamA-api-3c-4d\n", Some("teamA"));

        assert!(index.contains("orders-teamA-api"));
        assert!(index.contains("teamA-api"));
        // a namespace without the trailing dash is not a prefix match
        let index = resolve("NAME\nteamAB-api-1a-2b\n", Some("teamA"));
        assert!(index.contains("teamAB-api"));
    }

    #[test]
    fn header_only_listing_is_empty() {
        assert!(resolve("NAMESPACE   NAME   READY   STATUS   RESTARTS   AGE\n", None).is_empty());
        assert!(resolve("", None).is_empty());
    }

    #[test]
    fn header_without_name_column_is_empty() {
        assert!(resolve("POD STATUS\napi-1a-2b Running\n", None).is_empty());
    }

    #[test]
    fn later_row_wins_on_collision() {
        let listing = "\
NAMESPACE NAME STATUS
shop dev-cart-old11-aaaa Running
shop dev-cart-new22-bbbb Running
";
        let index = resolve(listing, None);

        assert_eq!(index.instance("cart", EnvironmentTag::Dev).unwrap().id(), "new22-bbbb");
        assert_eq!(index.iter().count(), 1);
    }

    #[test]
    fn resolving_twice_gives_equal_indexes() {
        let listing = "NAMESPACE NAME STATUS\nshop dev-cart-1-a Running\nshop api-2-b Pending\n";
        assert_eq!(resolve(listing, None), resolve(listing, None));
    }

    #[test]
    fn short_rows_and_blank_lines_are_tolerated() {
        let listing = "NAMESPACE NAME STATUS\n\nshop\nshop web-1a-2b Running\n";
        let index = resolve(listing, None);

        assert!(index.contains("web"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn missing_status_cell_under_status_column_is_skipped() {
        assert!(resolve("NAMESPACE NAME STATUS\nshop web-1a-2b\n", None).is_empty());
        // no STATUS column at all still counts as running
        assert!(resolve("NAMESPACE NAME\nshop web-1a-2b\n", None).contains("web"));
    }
}
