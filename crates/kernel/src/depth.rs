//! Live depth control for extruded solids.

use tracing::{debug, instrument};

use crate::extrude::{ExtrudeError, ExtrusionHandle, validate_depth};
use crate::parts::PartTree;

/// Re-extrude `handle`'s solid to `depth` in place. Only z coordinates change;
/// the result is identical to building the solid afresh at `depth`. On error the
/// solid is left untouched.
pub fn set_depth(handle: &ExtrusionHandle, depth: f64) -> Result<(), ExtrudeError> {
    validate_depth(depth)?;
    handle.lock_solid().apply_depth(depth);
    Ok(())
}

/// Apply `depth` to every extruded part of `tree`. Returns the number of solids
/// updated. Nothing changes if `depth` is invalid.
#[instrument(skip(tree), fields(parts = tree.len()))]
pub fn set_tree_depth(tree: &PartTree, depth: f64) -> Result<usize, ExtrudeError> {
    validate_depth(depth)?;

    let mut updated = 0;
    let mut pending = vec![tree.root()];
    while let Some(id) = pending.pop() {
        let Some(part) = tree.get(id) else {
            continue;
        };
        if let Some(handle) = part.handle() {
            handle.lock_solid().apply_depth(depth);
            updated += 1;
        }
        pending.extend_from_slice(part.children());
    }
    debug!(updated, "applied depth to part tree");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrude::{build_solid, extrude};
    use crate::geometry::point::Point2d;
    use crate::normalize::CanonicalPolygon;
    use crate::parts::{Part, PartKind};

    fn pentagon() -> CanonicalPolygon {
        CanonicalPolygon::from_points(
            (0..5)
                .map(|i| {
                    let a = std::f64::consts::TAU * i as f64 / 5.0;
                    Point2d::new(100.0 * a.cos(), 100.0 * a.sin())
                })
                .collect(),
        )
    }

    #[test]
    fn test_set_depth_matches_fresh_build() {
        let handle = extrude(pentagon(), 1.0).unwrap();
        set_depth(&handle, 7.0).unwrap();
        set_depth(&handle, 4.5).unwrap();
        assert_eq!(handle.solid(), build_solid(&pentagon(), 4.5).unwrap());
    }

    #[test]
    fn test_invalid_depth_leaves_solid() {
        let handle = extrude(pentagon(), 2.0).unwrap();
        let before = handle.solid();
        assert!(matches!(set_depth(&handle, 0.0), Err(ExtrudeError::InvalidDepth { .. })));
        assert!(matches!(set_depth(&handle, -3.0), Err(ExtrudeError::InvalidDepth { .. })));
        assert_eq!(handle.solid(), before);
    }

    #[test]
    fn test_clone_sees_update() {
        let handle = extrude(pentagon(), 1.0).unwrap();
        let view = handle.clone();
        set_depth(&handle, 12.0).unwrap();
        assert_eq!(view.depth(), 12.0);
    }

    #[test]
    fn test_tree_depth_reaches_nested_parts() {
        let mut tree = PartTree::with_body(extrude(pentagon(), 1.0).unwrap());
        let mut parent = tree.root();
        for i in 0..50 {
            let kind = if i % 2 == 0 {
                PartKind::Extruded(extrude(pentagon(), 1.0).unwrap())
            } else {
                PartKind::Group
            };
            parent = tree.attach(parent, Part::new(format!("segment{i}"), kind)).unwrap();
        }
        assert_eq!(set_tree_depth(&tree, 3.0).unwrap(), 26);
        assert!(tree.handles().iter().all(|h| h.depth() == 3.0));

        assert!(set_tree_depth(&tree, f64::NAN).is_err());
        assert!(tree.handles().iter().all(|h| h.depth() == 3.0));
    }
}
