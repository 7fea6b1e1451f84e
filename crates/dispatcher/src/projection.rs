use std::collections::HashSet;

use alarm_domain::{CatalogResource, OperationResource, ResourceViewItem};

/// 将资源目录投影为派遣视图
///
/// 每个活跃目录条目对应一个视图项；与任一报警资源匹配的条目不可派遣。
/// `dispatched` 一律为 `false`，由 [`apply_dispatched`] 补充。目录顺序保持不变。
pub fn project<F>(
    catalog: &[CatalogResource],
    alarmed: &[OperationResource],
    is_match: F,
) -> Vec<ResourceViewItem>
where
    F: Fn(&CatalogResource, &OperationResource) -> bool,
{
    catalog
        .iter()
        .filter(|resource| resource.is_active)
        .map(|resource| {
            let is_alarmed = alarmed.iter().any(|a| is_match(resource, a));
            ResourceViewItem::new(resource.clone(), !is_alarmed)
        })
        .collect()
}

/// 按派遣服务返回的ID集合设置 `dispatched` 标志
pub fn apply_dispatched(items: &mut [ResourceViewItem], dispatched: &HashSet<String>) {
    for item in items.iter_mut() {
        if dispatched.contains(item.resource_id()) {
            item.dispatched = true;
        }
    }
}
