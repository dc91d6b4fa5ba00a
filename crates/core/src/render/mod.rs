//! Overlay compositing.
//!
//! [`OverlayRenderer`] redraws the whole overlay on every display tick from
//! whatever landmarks and accessory settings are current at that moment.

pub mod raster;
pub mod surface;

use tokio::sync::watch;

use crate::accessory::{Accessory, AccessorySettings};
use crate::assets::{AssetOverrideStore, OverrideSlot};
use crate::geometry::{Point, Rect};
use crate::landmarks::{LandmarkReader, Landmarks};
use crate::primitives::{draw_earrings, draw_necklace, draw_nose, earring_anchor, earring_size};
use crate::state::AppState;

pub use raster::RasterSurface;
pub use surface::{DisplayList, DrawCommand, Surface};

/// What one render tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The surface has no area yet; nothing was touched.
    SurfaceUnavailable,
    /// The surface was cleared and no face is present.
    NoFace,
    /// Accessories that produced output, in draw order.
    Drawn { accessories: Vec<Accessory> },
}

/// Per-frame compositor. Holds read-only views of the shared state.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    landmarks: LandmarkReader,
    accessories: watch::Receiver<AccessorySettings>,
    overrides: AssetOverrideStore,
}

impl OverlayRenderer {
    pub fn new(app: &AppState) -> Self {
        Self {
            landmarks: app.landmarks.reader(),
            accessories: app.accessories.subscribe(),
            overrides: app.overrides.clone(),
        }
    }

    pub fn tick<S: Surface + ?Sized>(&self, surface: &mut S) -> RenderOutcome {
        let (width, height) = surface.size();
        if width == 0 || height == 0 {
            return RenderOutcome::SurfaceUnavailable;
        }
        surface.clear();

        let Some(current) = self.landmarks.current() else {
            return RenderOutcome::NoFace;
        };
        if !current.is_valid() {
            tracing::debug!("skipping unusable landmarks");
            return RenderOutcome::NoFace;
        }
        let face = current.fitted_to(width, height);
        let settings = self.accessories.borrow().clone();

        let mut accessories = Vec::new();
        for accessory in [Accessory::Necklace, Accessory::Earrings, Accessory::Nosepin] {
            if settings.is_enabled(accessory) && self.draw(surface, accessory, &face, &settings) {
                accessories.push(accessory);
            }
        }
        RenderOutcome::Drawn { accessories }
    }

    /// Draws one accessory; returns `false` if it had nothing to draw.
    fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        accessory: Accessory,
        face: &Landmarks,
        settings: &AccessorySettings,
    ) -> bool {
        let fw = face.face_width;
        let asset = self.overrides.get(OverrideSlot::for_accessory(accessory));

        match accessory {
            Accessory::Necklace => {
                let scale = settings.necklace.scale();
                if let Some(asset) = asset {
                    surface.draw_image(&asset, neck_rect(face.chin, fw, scale));
                    return true;
                }
                let Some(style) = settings.necklace.style else {
                    return false;
                };
                draw_necklace(surface, face.chin, fw, scale, style);
            }
            Accessory::Earrings => {
                let scale = settings.earrings.scale();
                if let Some(asset) = asset {
                    let size = earring_size(fw, scale);
                    for ear in face.ears() {
                        surface.draw_image(&asset, Rect::centered(earring_anchor(ear, fw), size));
                    }
                    return true;
                }
                let Some(style) = settings.earrings.style else {
                    return false;
                };
                draw_earrings(surface, face.ears(), fw, scale, style);
            }
            Accessory::Nosepin => {
                let scale = settings.nosepin.scale();
                if let Some(asset) = asset {
                    surface.draw_image(&asset, Rect::centered(face.nose, nose_asset_size(fw, scale)));
                    return true;
                }
                let Some(style) = settings.nosepin.style else {
                    return false;
                };
                draw_nose(surface, face.nose, fw, scale, style);
            }
        }
        true
    }
}

/// Where a necklace override image is placed.
pub fn neck_rect(chin: Point, face_width: f32, scale: f32) -> Rect {
    let width = face_width * 1.1 * scale;
    let height = width * 0.35;
    Rect::new(
        chin.x - width / 2.0,
        chin.y + face_width * 0.02,
        width,
        height,
    )
}

/// Edge of the square a nose override image fills.
pub fn nose_asset_size(face_width: f32, scale: f32) -> f32 {
    (face_width * 0.08).max(12.0) * scale
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;
    use crate::accessory::{EarringStyle, NecklaceStyle, NoseStyle};
    use crate::geometry::centroid;

    fn face() -> Landmarks {
        Landmarks::new(
            200.0,
            Point::new(200.0, 260.0),
            Point::new(100.0, 180.0),
            Point::new(300.0, 180.0),
            Point::new(200.0, 200.0),
        )
    }

    fn app_with(settings: AccessorySettings) -> (AppState, OverlayRenderer) {
        let (app, _status) = AppState::new(settings);
        let renderer = OverlayRenderer::new(&app);
        (app, renderer)
    }

    fn only(accessory: Accessory) -> AccessorySettings {
        let mut settings = AccessorySettings::default();
        settings.toggle(accessory);
        settings
    }

    fn painted_centroid(surface: &RasterSurface) -> Point {
        let points: Vec<Point> = surface
            .to_image()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .map(|(x, y, _)| Point::new(x as f32 + 0.5, y as f32 + 0.5))
            .collect();
        centroid(&points).expect("something was painted")
    }

    #[test]
    fn every_style_lands_near_its_anchor() {
        let ears_mid = Point::new(200.0, 184.0);
        let necklace_region = Rect::new(100.0, 270.0, 200.0, 80.0);

        for style in [EarringStyle::Stud, EarringStyle::Hoop, EarringStyle::Drop] {
            let mut settings = only(Accessory::Earrings);
            settings.earrings.style = Some(style);
            let (app, renderer) = app_with(settings);
            app.landmarks.replace(face());

            let mut surface = RasterSurface::new(400, 400);
            renderer.tick(&mut surface);
            let center = painted_centroid(&surface);
            assert!(center.distance(ears_mid) < 20.0, "{style:?} centroid {center:?}");
        }

        for style in [NecklaceStyle::Plain, NecklaceStyle::Pearl, NecklaceStyle::Pendant] {
            let mut settings = only(Accessory::Necklace);
            settings.necklace.style = Some(style);
            let (app, renderer) = app_with(settings);
            app.landmarks.replace(face());

            let mut surface = RasterSurface::new(400, 400);
            renderer.tick(&mut surface);
            let center = painted_centroid(&surface);
            assert!(
                center.x >= necklace_region.x
                    && center.x <= necklace_region.x + necklace_region.width
                    && center.y >= necklace_region.y
                    && center.y <= necklace_region.y + necklace_region.height,
                "{style:?} centroid {center:?}"
            );
        }

        for style in [NoseStyle::Dot, NoseStyle::Stud, NoseStyle::Ring] {
            let mut settings = only(Accessory::Nosepin);
            settings.nosepin.style = Some(style);
            let (app, renderer) = app_with(settings);
            app.landmarks.replace(face());

            let mut surface = RasterSurface::new(400, 400);
            renderer.tick(&mut surface);
            let center = painted_centroid(&surface);
            assert!(center.distance(Point::new(200.0, 200.0)) < 10.0, "{style:?} centroid {center:?}");
        }
    }

    #[test]
    fn absent_face_leaves_a_cleared_surface() {
        let (app, renderer) = app_with(only(Accessory::Necklace));
        app.landmarks.replace(face());

        let mut surface = RasterSurface::new(400, 400);
        assert_eq!(
            renderer.tick(&mut surface),
            RenderOutcome::Drawn {
                accessories: vec![Accessory::Necklace]
            }
        );
        assert!(surface.painted_pixels() > 0);

        app.landmarks.clear();
        assert_eq!(renderer.tick(&mut surface), RenderOutcome::NoFace);
        assert_eq!(surface.painted_pixels(), 0);
    }

    #[test]
    fn override_replaces_the_procedural_shape_until_cleared() {
        let (app, renderer) = app_with(only(Accessory::Earrings));
        app.landmarks.replace(face());
        app.overrides.set(OverrideSlot::Ear, RgbaImage::new(8, 8)).unwrap();

        let mut list = DisplayList::new(400, 400);
        renderer.tick(&mut list);
        assert_eq!(list.commands().len(), 2);
        assert!(list.commands().iter().all(DrawCommand::is_image));

        let size = earring_size(200.0, 1.0);
        let DrawCommand::Image { dest, .. } = &list.commands()[0] else {
            unreachable!()
        };
        assert_eq!(*dest, Rect::centered(Point::new(100.0, 184.0), size));

        app.overrides.clear(OverrideSlot::Ear).unwrap();
        renderer.tick(&mut list);
        assert!(!list.is_empty());
        assert!(list.commands().iter().all(|c| !c.is_image()));
    }

    #[test]
    fn neck_and_nose_overrides_use_their_own_layouts() {
        let mut settings = only(Accessory::Necklace);
        settings.toggle(Accessory::Nosepin);
        settings.set_scale_boost(1.5);
        let (app, renderer) = app_with(settings);
        app.landmarks.replace(face());
        app.overrides.set(OverrideSlot::Neck, RgbaImage::new(4, 2)).unwrap();
        app.overrides.set(OverrideSlot::Nose, RgbaImage::new(2, 2)).unwrap();

        let mut list = DisplayList::new(400, 400);
        renderer.tick(&mut list);
        let dests: Vec<Rect> = list
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Image { dest, .. } => Some(*dest),
                _ => None,
            })
            .collect();

        assert_eq!(dests.len(), 2);
        let neck = dests[0];
        for (got, want) in [
            (neck.x, 35.0),
            (neck.y, 264.0),
            (neck.width, 330.0),
            (neck.height, 115.5),
        ] {
            assert!((got - want).abs() < 1e-3, "neck {neck:?}");
        }
        let nose = dests[1];
        assert!((nose.width - 24.0).abs() < 1e-3);
        assert!(nose.center().distance(Point::new(200.0, 200.0)) < 1e-3);
    }

    #[test]
    fn enormous_faces_draw_overrides_without_scaling_the_whole_image() {
        let mut settings = only(Accessory::Necklace);
        settings.toggle(Accessory::Earrings);
        settings.set_scale_boost(1000.0);
        let (app, renderer) = app_with(settings);
        app.landmarks.replace(Landmarks::new(
            1.0e6,
            Point::new(200.0, -20_100.0),
            Point::new(100.0, 180.0),
            Point::new(300.0, 180.0),
            Point::new(200.0, 200.0),
        ));
        let gold = image::Rgba([240, 200, 90, 255]);
        app.overrides
            .set(OverrideSlot::Neck, RgbaImage::from_pixel(4, 2, gold))
            .unwrap();
        app.overrides
            .set(OverrideSlot::Ear, RgbaImage::from_pixel(3, 3, gold))
            .unwrap();

        let mut surface = RasterSurface::new(400, 400);
        assert_eq!(
            renderer.tick(&mut surface),
            RenderOutcome::Drawn {
                accessories: vec![Accessory::Necklace, Accessory::Earrings]
            }
        );
        assert_eq!(surface.size(), (400, 400));
        assert_eq!(surface.painted_pixels(), 400 * 400);
        assert_eq!(surface.to_image().get_pixel(200, 200), &gold);
    }

    #[test]
    fn unknown_style_draws_nothing_for_that_accessory() {
        let mut settings = only(Accessory::Necklace);
        settings.necklace.set_style_str("choker");
        settings.toggle(Accessory::Nosepin);
        let (app, renderer) = app_with(settings);
        app.landmarks.replace(face());

        let mut list = DisplayList::new(400, 400);
        assert_eq!(
            renderer.tick(&mut list),
            RenderOutcome::Drawn {
                accessories: vec![Accessory::Nosepin]
            }
        );
    }

    #[test]
    fn zero_sized_surface_is_skipped() {
        let (app, renderer) = app_with(only(Accessory::Earrings));
        app.landmarks.replace(face());

        let mut surface = RasterSurface::new(0, 0);
        assert_eq!(renderer.tick(&mut surface), RenderOutcome::SurfaceUnavailable);

        let mut list = DisplayList::new(640, 0);
        assert_eq!(renderer.tick(&mut list), RenderOutcome::SurfaceUnavailable);
        assert!(list.is_empty());
    }

    #[test]
    fn settings_changes_apply_on_the_next_tick() {
        let (app, renderer) = app_with(AccessorySettings::default());
        app.landmarks.replace(face());

        let mut list = DisplayList::new(400, 400);
        assert_eq!(
            renderer.tick(&mut list),
            RenderOutcome::Drawn { accessories: vec![] }
        );

        app.accessories.update(|s| {
            s.toggle(Accessory::Earrings);
        });
        assert_eq!(
            renderer.tick(&mut list),
            RenderOutcome::Drawn {
                accessories: vec![Accessory::Earrings]
            }
        );
    }
}
