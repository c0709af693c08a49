//! End-to-end tests: scene to mask to contours to solid, and live depth edits.

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;

use shadow_kernel::contour::{DEFAULT_THRESHOLD, extract};
use shadow_kernel::extrude::{ExtrudeError, build_solid, extrude};
use shadow_kernel::geometry::point::Point3d;
use shadow_kernel::geometry::vector::Vec3;
use shadow_kernel::mask::Mask;
use shadow_kernel::normalize::{CANONICAL_EXTENT, normalize};
use shadow_kernel::render::cache::GeometryCache;
use shadow_kernel::scene::element::{Pose, SceneObject};
use shadow_kernel::scene::shape::Shape;
use shadow_kernel::scene::{Backdrop, CameraPose, CanvasPlacement, ShadowLight};
use shadow_kernel::{
    Generation, GenerationWorker, MonsterPipeline, PipelineConfig, PipelineError, RenderSettings, SceneConfig,
    SceneRenderer, set_depth, set_tree_depth,
};

/// Ball in front of a wall, lit from the side so its shadow falls beside it.
fn ball_scene() -> SceneConfig {
    SceneConfig::new(CameraPose::at(Point3d::new(0.0, 0.0, 10.0)))
        .with_shadow_light(ShadowLight::spot(Point3d::new(6.0, 0.0, 10.0), Vec3::new(-0.6, 0.0, -1.0), 90.0))
        .with_backdrop(Backdrop::new(Pose::default(), 20.0, 20.0))
        .with_prop(SceneObject::new(
            "ball",
            Shape::Sphere { radius: 1.0 },
            Pose::at(Point3d::new(0.0, 0.0, 2.0)),
        ))
}

fn disk_mask(size: u32, radius: f64) -> Mask {
    let c = f64::from(size) / 2.0;
    Mask::from_fn(size, size, |x, y| {
        let dx = f64::from(x) + 0.5 - c;
        let dy = f64::from(y) + 0.5 - c;
        if dx * dx + dy * dy <= radius * radius { 0 } else { 255 }
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn render_is_deterministic() {
    let renderer = SceneRenderer::default();
    let a = renderer.render(&ball_scene(), 96).unwrap();
    let b = renderer.render(&ball_scene(), 96).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
    assert_eq!(extract(&a, DEFAULT_THRESHOLD), extract(&b, DEFAULT_THRESHOLD));
    assert!(a.count_below(DEFAULT_THRESHOLD) > 0);
}

#[test]
fn render_reuses_cached_geometry() {
    let cache = Arc::new(GeometryCache::new());
    let renderer = SceneRenderer::with_cache(RenderSettings::default(), Arc::clone(&cache));
    renderer.render(&ball_scene(), 16).unwrap();
    let first = cache.stats();
    renderer.clone().render(&ball_scene(), 16).unwrap();
    let second = cache.stats();
    assert_eq!(first.misses, 1);
    assert_eq!(second.misses, 1);
    assert_eq!(second.hits, first.hits + 1);
}

#[test]
fn render_never_touches_config() {
    let scene = ball_scene();
    let before = scene.clone();
    SceneRenderer::default().render(&scene, 16).unwrap();
    assert_eq!(scene, before);
}

#[test]
fn soft_shadow_has_penumbra() {
    let hard = SceneRenderer::new(RenderSettings::hard_shadows())
        .render(&ball_scene(), 128)
        .unwrap();
    let soft = SceneRenderer::new(RenderSettings {
        softness: 0.5,
        ..RenderSettings::default()
    })
    .render(&ball_scene(), 128)
    .unwrap();
    let grey = |m: &Mask| m.as_bytes().iter().filter(|&&v| v != 0 && v != 255).count();
    assert_eq!(grey(&hard), 0);
    assert!(grey(&soft) > 0);
}

#[test]
fn decorative_lights_do_not_shadow() {
    let with_light = ball_scene().with_element(shadow_kernel::scene::element::SceneElement::DecorativeLight(
        shadow_kernel::scene::DecorativeLight::new("lamp", Point3d::new(0.0, 0.0, 1.0), 5.0),
    ));
    let renderer = SceneRenderer::default();
    assert_eq!(
        renderer.render(&with_light, 48).unwrap(),
        renderer.render(&ball_scene(), 48).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_blank_mask_has_no_silhouette() {
    let mask = Mask::from_fn(64, 64, |_, _| 255);
    let contours = extract(&mask, DEFAULT_THRESHOLD);
    assert!(contours.is_empty());
    assert!(normalize(&contours).is_none());
    let outcome = MonsterPipeline::default().generate_from_mask(&mask).unwrap();
    assert!(matches!(outcome, Generation::NoSilhouetteFound));
}

#[test]
fn scenario_disk_becomes_canonical_body() {
    let contours = extract(&disk_mask(256, 60.0), DEFAULT_THRESHOLD);
    assert_eq!(contours.len(), 1);
    let traced = contours.get(0).unwrap().len();

    let poly = normalize(&contours).unwrap();
    assert_relative_eq!(poly.max_magnitude(), CANONICAL_EXTENT, epsilon = 1e-9);
    let c = poly.centroid();
    assert_relative_eq!(c.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(c.y, 0.0, epsilon = 1e-9);

    let handle = extrude(poly, 1.0).unwrap();
    let solid = handle.solid();
    assert_eq!(solid.ring_len(), traced);
    assert_eq!(solid.wall_triangles().len(), 2 * traced);
}

#[test]
fn scenario_invalid_depth_keeps_geometry() {
    let poly = normalize(&extract(&disk_mask(64, 20.0), DEFAULT_THRESHOLD)).unwrap();
    let handle = extrude(poly, 2.0).unwrap();
    let before = handle.solid();
    for bad in [0.0, -1.0] {
        assert_eq!(set_depth(&handle, bad), Err(ExtrudeError::InvalidDepth { depth: bad }));
    }
    assert_eq!(handle.solid(), before);
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn ball_shadow_becomes_monster() {
    let config = PipelineConfig {
        resolution: 128,
        ..PipelineConfig::default()
    };
    let monster = MonsterPipeline::new(config)
        .generate(&ball_scene())
        .unwrap()
        .monster()
        .unwrap();
    assert!(monster.contour_count >= 1);
    assert_relative_eq!(monster.body.polygon().max_magnitude(), CANONICAL_EXTENT, epsilon = 1e-9);

    set_tree_depth(&monster.parts, 5.0).unwrap();
    assert_eq!(monster.body.depth(), 5.0);
    assert_eq!(monster.body.solid(), build_solid(monster.body.polygon(), 5.0).unwrap());
}

#[test]
fn compound_policy_extrudes_every_blob() {
    let mask = Mask::from_fn(80, 80, |x, y| {
        let body = (10..50).contains(&x) && (10..50).contains(&y);
        let arm = (60..70).contains(&x) && (20..30).contains(&y);
        if body || arm { 0 } else { 255 }
    });
    let single = MonsterPipeline::default().generate_from_mask(&mask).unwrap().monster().unwrap();
    assert_eq!(single.parts.len(), 1);
    assert_eq!(single.contour_count, 2);

    let compound = MonsterPipeline::new(PipelineConfig::compound())
        .generate_from_mask(&mask)
        .unwrap()
        .monster()
        .unwrap();
    assert_eq!(compound.parts.len(), 2);
    assert_eq!(set_tree_depth(&compound.parts, 3.0).unwrap(), 2);
}

#[test]
fn placed_prop_casts_shadow() {
    let prop = CanvasPlacement {
        position: (200.0, 160.0),
        rotation_degrees: 30.0,
        scale: 0.5,
    }
    .place_prop(
        "crate",
        Shape::Box {
            width: 2.0,
            height: 2.0,
            length: 2.0,
        },
    );
    let scene = SceneConfig::new(CameraPose::at(Point3d::new(0.0, 0.0, 10.0)))
        .with_shadow_light(ShadowLight::omni(Point3d::new(5.0, 4.0, 10.0)))
        .with_backdrop(Backdrop::new(Pose::at(Point3d::new(0.0, 0.0, -5.0)), 30.0, 30.0))
        .with_prop(prop);
    let mask = SceneRenderer::default().render(&scene, 64).unwrap();
    assert!(mask.count_below(DEFAULT_THRESHOLD) > 0);
}

#[test]
fn concurrent_depth_edits_leave_a_built_solid() {
    let poly = normalize(&extract(&disk_mask(64, 20.0), DEFAULT_THRESHOLD)).unwrap();
    let handle = extrude(poly.clone(), 1.0).unwrap();
    let depths = [2.0, 3.5, 7.0, 11.0];

    let generated = std::thread::scope(|s| {
        for &depth in &depths {
            let handle = handle.clone();
            s.spawn(move || {
                for _ in 0..200 {
                    set_depth(&handle, depth).unwrap();
                }
            });
        }
        // A new generation proceeds while the older handle is being edited.
        let fresh = s.spawn(|| {
            MonsterPipeline::default()
                .generate_from_mask(&disk_mask(128, 40.0))
                .unwrap()
                .monster()
                .unwrap()
        });
        fresh.join().unwrap()
    });

    assert_eq!(generated.body.depth(), 1.0);
    assert!(!generated.body.shares_solid_with(&handle));
    let solid = handle.solid();
    assert!(
        depths
            .iter()
            .any(|&d| solid == build_solid(&poly, d).unwrap()),
        "final depth {} is not one of the written depths",
        solid.depth()
    );
}

// ---------------------------------------------------------------------------
// Background worker
// ---------------------------------------------------------------------------

#[test]
fn worker_delivers_result() {
    let config = PipelineConfig {
        resolution: 64,
        ..PipelineConfig::default()
    };
    let worker = GenerationWorker::spawn(MonsterPipeline::new(config));
    let id = worker.submit(&ball_scene());
    let result = worker.recv_timeout(Duration::from_secs(30)).unwrap();
    assert_eq!(result.id, id);
    assert!(matches!(result.outcome, Ok(Generation::Monster(_))));
}

#[test]
fn worker_cancel_stops_request() {
    let config = PipelineConfig {
        resolution: 4096,
        ..PipelineConfig::default()
    };
    let worker = GenerationWorker::spawn(MonsterPipeline::new(config));
    let id = worker.submit(&SceneConfig::bedroom());
    assert!(worker.cancel(id));
    let result = worker.recv_timeout(Duration::from_secs(30)).unwrap();
    assert_eq!(result.id, id);
    assert_eq!(result.outcome.unwrap_err(), PipelineError::Cancelled);
}

#[test]
fn worker_drop_joins_thread() {
    let worker = GenerationWorker::spawn(MonsterPipeline::new(PipelineConfig::default()));
    worker.submit(&SceneConfig::bedroom());
    drop(worker);
}
