use colored::*;
use comfy_table::Table;

use crate::error::Result;
use crate::gateway::KubeGateway;
use crate::models::{EnvironmentTag, ServiceIndex};
use crate::prompt::InquirePrompter;
use crate::session::{self, NamespaceArg};
use crate::utils;

pub async fn run(
    gateway: &KubeGateway,
    namespace_arg: NamespaceArg,
    environment: Option<EnvironmentTag>,
) -> Result<()> {
    let scope = session::choose_namespace(gateway, &mut InquirePrompter, &namespace_arg).await?;
    let index = session::load_index(gateway, &scope).await?;

    if index.is_empty() {
        utils::print_info(&format!("No running services found in {scope}"));
        return Ok(());
    }

    println!("\n{}", format!("--- SERVICES IN {scope} ---").bold().bright_white());
    println!("{}", services_table(&index, environment));
    Ok(())
}

fn services_table(index: &ServiceIndex, environment: Option<EnvironmentTag>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Service", "Environment", "Namespace", "Pod"]);

    for (service, tag, instance) in index.iter() {
        if environment.is_some_and(|e| e != tag) {
            continue;
        }
        table.add_row(vec![
            service.to_string(),
            tag.to_string(),
            instance.namespace().to_string(),
            instance.pod_name(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;

    const LISTING: &str = "\
NAMESPACE NAME STATUS
shop dev-cart-1a-2b Running
shop prod-cart-3c-4d Running
billing invoices-5e-6f Running
";

    #[test]
    fn table_has_one_row_per_instance() {
        let table = services_table(&resolve(LISTING, None), None);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn environment_filter_limits_rows() {
        let table = services_table(&resolve(LISTING, None), Some(EnvironmentTag::Prod));
        let rendered = table.to_string();

        assert_eq!(table.row_count(), 1);
        assert!(rendered.contains("prod-cart-3c-4d"));
        assert!(!rendered.contains("invoices"));
    }
}
