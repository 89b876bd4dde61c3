use super::events::{BuildEvent, BuildEventHandler};
use super::warnings::WarningSink;
use crate::docker::ImageEngine;
use tracing::{debug, warn};

/// Makes sure every cache-from image is available locally
///
/// Missing images are pulled. Nothing here fails the build: a pull failure is
/// reported to `warnings`, and a failed lookup is logged and treated as a
/// missing image. Returns the number of images pulled.
pub async fn resolve_cache_from(
    engine: &dyn ImageEngine,
    warnings: &dyn WarningSink,
    events: &dyn BuildEventHandler,
    image: &str,
    cache_from: &[String],
) -> usize {
    let mut pulled = 0;

    for reference in cache_from {
        match engine.image_id(reference).await {
            Ok(Some(id)) => {
                debug!("cache-from image {} already present ({})", reference, id);
                continue;
            }
            Ok(None) => {}
            Err(e) => warn!("checking cache-from image {}: {:#}", reference, e),
        }

        events.on_event(&BuildEvent::CachePull {
            image: image.to_string(),
            cache_from: reference.clone(),
        });

        match engine.pull(reference).await {
            Ok(()) => pulled += 1,
            Err(e) => {
                debug!("pulling {}: {:#}", reference, e);
                warnings.warn(format!("Cache-From image couldn't be pulled: {}", reference));
            }
        }
    }

    pulled
}
