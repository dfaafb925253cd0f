use abt_gateway::{Gateway, GatewayError, Workspace};
use abt_model::{EntityCollection, EntitySet};
use tracing::info;

/// Full listing of one workspace.
///
/// Records are converted by the gateway through the same `from_record`
/// functions the declared-config builder uses. A listing failure is fatal
/// for the run: nothing can be compared without a snapshot.
pub fn fetch_snapshot(
    gateway: &dyn Gateway,
    workspace: &Workspace,
) -> Result<EntityCollection, GatewayError> {
    let sources: EntitySet<_> = gateway.list_sources(workspace)?.into_iter().collect();
    let destinations: EntitySet<_> = gateway.list_destinations(workspace)?.into_iter().collect();
    let links: EntitySet<_> = gateway.list_links(workspace)?.into_iter().collect();

    info!(
        workspace = %workspace.slug,
        sources = sources.len(),
        destinations = destinations.len(),
        links = links.len(),
        "deployment snapshot fetched"
    );

    Ok(EntityCollection {
        sources,
        destinations,
        links,
    })
}
