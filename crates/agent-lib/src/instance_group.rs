//! Live instance counting for instance groups

use crate::error::Result;
use crate::gcp::InstanceGroups;
use crate::models::InstanceGroupRef;
use crate::retry::RetryPolicy;
use std::sync::Arc;

/// Counts the instances that back a node pool's instance group
pub struct InstanceGroupCounter {
    groups: Arc<dyn InstanceGroups>,
    retry: RetryPolicy,
}

impl InstanceGroupCounter {
    pub fn new(groups: Arc<dyn InstanceGroups>, retry: RetryPolicy) -> Self {
        Self { groups, retry }
    }

    /// Count instances in the group behind `locator`.
    ///
    /// A malformed locator fails before any remote call is made.
    pub async fn count_instances(&self, locator: &str) -> Result<u64> {
        let group = InstanceGroupRef::parse(locator)?;

        let instances = self
            .retry
            .run("list_instances", || self.groups.list_instances(&group))
            .await?;

        Ok(instances.len() as u64)
    }
}
