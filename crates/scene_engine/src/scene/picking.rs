//! Ray picking primitives
//!
//! Provides the [`Ray`] passed to [`Selectable::intersects`](super::Selectable::intersects)
//! and a [`BoundingSphere`] that selectable entities can use as their pick shape.

use crate::foundation::math::{self, Mat4, Point3, Vec3};
use super::entity::EntityHandle;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Closest hit found by [`SceneGraph::select_hit`](super::SceneGraph::select_hit)
#[derive(Debug, Clone)]
pub struct PickHit {
    /// The entity that was hit
    pub entity: EntityHandle,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
}

/// A bounding sphere in an entity's local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center of the sphere
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Place the sphere in world space.
    ///
    /// The radius grows with the largest axis scale so the result still
    /// encloses a non-uniformly scaled shape.
    pub fn transformed(&self, world: &Mat4) -> Self {
        let center = world.transform_point(&Point3::from(self.center)).coords;
        let scale = math::scale_of(world);
        Self {
            center,
            radius: self.radius * scale.x.max(scale.y).max(scale.z),
        }
    }

    /// Distance along `ray` to the nearest intersection in front of its origin.
    ///
    /// A ray starting inside the sphere hits the far side.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        // Solve |origin + t*direction - center|^2 = radius^2
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2.0 * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let near = (-b - sqrt_discriminant) / (2.0 * a);
        let far = (-b + sqrt_discriminant) / (2.0 * a);

        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_direction_is_normalized() {
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -10.0));
        assert_relative_eq!(ray.direction, Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(ray.point_at(2.0), Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_sphere_hit_distance() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));

        assert_relative_eq!(sphere.intersect_ray(&ray).unwrap(), 9.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_behind_ray_is_missed() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));

        assert!(sphere.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_ray_from_inside_hits_far_side() {
        let sphere = BoundingSphere::new(Vec3::zeros(), 2.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::x());

        assert_relative_eq!(sphere.intersect_ray(&ray).unwrap(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_transformed_sphere_follows_world() {
        let world = Transform::from_position(Vec3::new(5.0, 0.0, 0.0))
            .with_scale(Vec3::new(1.0, 3.0, 2.0))
            .to_matrix();
        let sphere = BoundingSphere::new(Vec3::new(1.0, 0.0, 0.0), 0.5).transformed(&world);

        assert_relative_eq!(sphere.center, Vec3::new(6.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(sphere.radius, 1.5, epsilon = 1e-5);
    }
}
