use std::collections::BTreeMap;
use std::fmt;

/// One data row of a pod listing, borrowed from the listing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodRecord<'a> {
    pub namespace: Option<&'a str>,
    pub name: &'a str,
    pub status: Option<&'a str>,
}

/// Deployment stage inferred from a pod name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum EnvironmentTag {
    Dev,
    Qa,
    Stg,
    Prod,
    Default,
}

impl EnvironmentTag {
    /// Prefixed tags in match priority order.
    const PREFIXED: [EnvironmentTag; 4] = [Self::Dev, Self::Qa, Self::Stg, Self::Prod];

    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Dev => Some("dev-"),
            Self::Qa => Some("qa-"),
            Self::Stg => Some("stg-"),
            Self::Prod => Some("prod-"),
            Self::Default => None,
        }
    }

    pub fn classify(pod_name: &str) -> Self {
        Self::PREFIXED
            .into_iter()
            .find(|tag| tag.prefix().is_some_and(|p| pod_name.starts_with(p)))
            .unwrap_or(Self::Default)
    }

    /// Removes this tag's prefix from the front of `name`, if present.
    pub fn strip<'a>(self, name: &'a str) -> &'a str {
        self.prefix()
            .and_then(|p| name.strip_prefix(p))
            .unwrap_or(name)
    }
}

impl fmt::Display for EnvironmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Dev => "dev",
            Self::Qa => "qa",
            Self::Stg => "stg",
            Self::Prod => "prod",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

/// Addressable identity of one running pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescriptor {
    id: String,
    namespace: String,
    service_name: String,
}

impl InstanceDescriptor {
    pub fn new(
        id: impl Into<String>,
        namespace: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            namespace: namespace.into(),
            service_name: service_name.into(),
        }
    }

    /// Orchestrator-assigned suffix, e.g. `7f9c8-x2k1`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Full name including any environment prefix, without the suffix.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn pod_name(&self) -> String {
        format!("{}-{}", self.service_name(), self.id())
    }
}

impl fmt::Display for InstanceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.pod_name(), self.namespace)
    }
}

/// Logical service name -> environment -> running instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceIndex {
    services: BTreeMap<String, BTreeMap<EnvironmentTag, InstanceDescriptor>>,
}

impl ServiceIndex {
    /// Overwrites any instance already stored for the same key.
    pub(crate) fn insert(
        &mut self,
        service: impl Into<String>,
        tag: EnvironmentTag,
        instance: InstanceDescriptor,
    ) {
        self.services
            .entry(service.into())
            .or_default()
            .insert(tag, instance);
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Logical service names, sorted.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn environments(&self, service: &str) -> Vec<EnvironmentTag> {
        self.services
            .get(service)
            .map(|envs| envs.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn instance(&self, service: &str, tag: EnvironmentTag) -> Option<&InstanceDescriptor> {
        self.services.get(service)?.get(&tag)
    }

    /// Every (service, environment, instance) triple in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, EnvironmentTag, &InstanceDescriptor)> {
        self.services.iter().flat_map(|(name, envs)| {
            envs.iter()
                .map(move |(tag, instance)| (name.as_str(), *tag, instance))
        })
    }
}

/// Namespace scope picked at the start of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceChoice {
    All,
    Named(String),
}

impl NamespaceChoice {
    pub fn as_filter(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(ns) => Some(ns),
        }
    }
}

impl fmt::Display for NamespaceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("<all namespaces>"),
            Self::Named(ns) => f.write_str(ns),
        }
    }
}

#[derive(Clone)]
pub struct LogMessage {
    pub source: String,
    pub message: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", crate::utils::source_prefix(&self.source), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_prefix_priority() {
        assert_eq!(EnvironmentTag::classify("dev-api-1-2"), EnvironmentTag::Dev);
        assert_eq!(EnvironmentTag::classify("qa-api-1-2"), EnvironmentTag::Qa);
        assert_eq!(EnvironmentTag::classify("stg-api-1-2"), EnvironmentTag::Stg);
        assert_eq!(EnvironmentTag::classify("prod-api-1-2"), EnvironmentTag::Prod);
        assert_eq!(EnvironmentTag::classify("api-1-2"), EnvironmentTag::Default);
        // prefix must include the dash
        assert_eq!(EnvironmentTag::classify("devops-1-2"), EnvironmentTag::Default);
        assert_eq!(EnvironmentTag::classify("production-1-2"), EnvironmentTag::Default);
    }

    #[test]
    fn strip_only_removes_own_prefix() {
        assert_eq!(EnvironmentTag::Dev.strip("dev-billing"), "billing");
        assert_eq!(EnvironmentTag::Dev.strip("qa-billing"), "qa-billing");
        assert_eq!(EnvironmentTag::Default.strip("dev-billing"), "dev-billing");
    }

    #[test]
    fn pod_name_joins_service_and_id() {
        let instance = InstanceDescriptor::new("abc12-99zz", "payments", "dev-billing");
        assert_eq!(instance.pod_name(), "dev-billing-abc12-99zz");
        assert_eq!(instance.to_string(), "dev-billing-abc12-99zz (payments)");
    }

    #[test]
    fn log_message_shows_source_then_line() {
        let msg = LogMessage {
            source: "cart/dev".to_string(),
            message: "GET /orders 200".to_string(),
        };
        let rendered = msg.to_string();

        assert!(rendered.contains("[cart/dev]"));
        assert!(rendered.ends_with(" GET /orders 200"));
    }

    #[test]
    fn index_lists_services_sorted() {
        let mut index = ServiceIndex::default();
        index.insert("orders", EnvironmentTag::Prod, InstanceDescriptor::new("a-b", "ns", "prod-orders"));
        index.insert("billing", EnvironmentTag::Qa, InstanceDescriptor::new("c-d", "ns", "qa-billing"));
        index.insert("orders", EnvironmentTag::Dev, InstanceDescriptor::new("e-f", "ns", "dev-orders"));

        assert_eq!(index.services().collect::<Vec<_>>(), ["billing", "orders"]);
        assert_eq!(
            index.environments("orders"),
            [EnvironmentTag::Dev, EnvironmentTag::Prod]
        );
        assert!(index.environments("missing").is_empty());
        assert_eq!(index.iter().count(), 3);
    }
}
