//! The built-in demo scene.

use slimtrace::math::{Color, Vec3};
use slimtrace::{
    Camera, Cube, Material, Plane, PointLight, Scene, SceneError, Sphere, Tetrahedron,
};

/// A floor and back wall with every masked primitive kind, one glass sphere
/// and one object that casts no shadow.
pub fn scene() -> Result<Scene, SceneError> {
    let mut scene = Scene::new(vec![Material::diffuse(Color::new(0.8, 0.8, 0.75))]);
    let wall = scene.add_material(Material::diffuse(Color::new(0.55, 0.6, 0.7)));
    let red = scene.add_material(Material::diffuse(Color::new(0.85, 0.2, 0.15)));
    let green = scene.add_material(Material::diffuse(Color::new(0.2, 0.75, 0.3)));
    let gold = scene.add_material(Material::diffuse(Color::new(0.9, 0.7, 0.2)));
    let glass = scene.add_material(Material::transparent(Color::new(0.6, 0.8, 1.0)));

    scene.add_plane(Plane {
        position: Vec3::new(0.0, -1.0, 0.0),
        normal: Vec3::y(),
        material_id: 0,
    })?;
    scene.add_plane(Plane {
        position: Vec3::new(0.0, 0.0, 14.0),
        normal: -Vec3::z(),
        material_id: wall,
    })?;

    scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 6.0), 1.0, red))?;
    scene.add_sphere(Sphere::new(Vec3::new(-2.6, -0.4, 7.5), 0.6, glass))?;
    let mut floating = Sphere::new(Vec3::new(1.6, 1.6, 8.0), 0.5, gold);
    floating.casts_shadow = false;
    scene.add_sphere(floating)?;

    scene.add_cube(Cube::new(Vec3::new(2.4, -0.4, 6.5), 0.6, green))?;
    scene.add_cube(Cube::new(Vec3::new(-1.2, -0.75, 4.5), 0.25, gold))?;

    scene.add_tetrahedron(Tetrahedron::regular(Vec3::new(-1.0, 0.2, 9.0), 1.2, wall))?;

    scene.add_point_light(PointLight {
        position: Vec3::new(-3.0, 5.0, 2.0),
        color: Color::new(1.0, 0.95, 0.9),
        intensity: 30.0,
    });
    scene.add_point_light(PointLight {
        position: Vec3::new(4.0, 3.0, 5.0),
        color: Color::new(0.6, 0.7, 1.0),
        intensity: 12.0,
    });

    Ok(scene)
}

/// Camera slightly above the floor looking at the red sphere.
pub fn camera() -> Camera {
    Camera::look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 6.0), 1.5)
}
