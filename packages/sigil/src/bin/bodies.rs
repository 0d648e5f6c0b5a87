use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use sigil::{component, Entity, EventBus, Registry, System, SystemState};

const TIME_STEP: f32 = 1.0;
const BOUNDS: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct Position(f32, f32);

#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity(f32, f32);

#[derive(Debug, Clone, Copy, Default)]
pub struct BoxCollider {
    half_width: f32,
    half_height: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Health(i32);

component!(Position, Velocity, BoxCollider, Health);

#[derive(Debug)]
pub struct CollisionEvent {
    a: Entity,
    b: Entity,
}

struct MovementSystem {
    state: SystemState,
}

impl MovementSystem {
    fn new() -> MovementSystem {
        MovementSystem {
            state: SystemState::new().requires::<Position>().requires::<Velocity>(),
        }
    }

    fn update(&self, registry: &mut Registry) -> sigil::Result<()> {
        for &entity in self.system_entities() {
            let Velocity(mut vx, mut vy) = *registry.get_component::<Velocity>(entity)?;
            let Position(x, y) = registry.get_component_mut::<Position>(entity)?;
            *x += TIME_STEP * vx;
            *y += TIME_STEP * vy;

            // Bounce off the walls.
            if x.abs() > BOUNDS {
                vx = -vx;
            }
            if y.abs() > BOUNDS {
                vy = -vy;
            }
            *registry.get_component_mut::<Velocity>(entity)? = Velocity(vx, vy);
        }
        Ok(())
    }
}

impl System for MovementSystem {
    fn state(&self) -> &SystemState { &self.state }
    fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
}

struct CollisionSystem {
    state: SystemState,
}

impl CollisionSystem {
    fn new() -> CollisionSystem {
        CollisionSystem {
            state: SystemState::new().requires::<Position>().requires::<BoxCollider>(),
        }
    }

    fn update(&self, registry: &Registry, bus: &mut EventBus) -> sigil::Result<()> {
        let entities = self.system_entities();
        for (idx, &a) in entities.iter().enumerate() {
            let Position(ax, ay) = *registry.get_component::<Position>(a)?;
            let a_box = *registry.get_component::<BoxCollider>(a)?;

            for &b in &entities[idx + 1..] {
                let Position(bx, by) = *registry.get_component::<Position>(b)?;
                let b_box = *registry.get_component::<BoxCollider>(b)?;

                let overlap_x = (ax - bx).abs() < a_box.half_width + b_box.half_width;
                let overlap_y = (ay - by).abs() < a_box.half_height + b_box.half_height;
                if overlap_x && overlap_y {
                    bus.emit_event(CollisionEvent { a, b });
                }
            }
        }
        Ok(())
    }
}

impl System for CollisionSystem {
    fn state(&self) -> &SystemState { &self.state }
    fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
}

struct DamageSystem {
    state: SystemState,
    collisions: Vec<CollisionEvent>,
}

impl DamageSystem {
    fn new() -> DamageSystem {
        DamageSystem {
            state: SystemState::new().requires::<BoxCollider>().requires::<Health>(),
            collisions: Vec::new(),
        }
    }

    fn subscribe_to_events(this: &Rc<RefCell<DamageSystem>>, bus: &mut EventBus) {
        bus.subscribe_bound(this, DamageSystem::on_collision);
    }

    fn on_collision(&mut self, event: &mut CollisionEvent) {
        self.collisions.push(CollisionEvent { a: event.a, b: event.b });
    }

    fn update(&mut self, registry: &mut Registry) -> sigil::Result<()> {
        for CollisionEvent { a, b } in self.collisions.drain(..) {
            for entity in [a, b] {
                // Projectiles vanish on impact.
                if registry.entity_belongs_to_group(entity, "projectiles") {
                    registry.kill_entity(entity)?;
                    continue;
                }

                if !registry.has_component::<Health>(entity) {
                    continue;
                }

                let health = registry.get_component_mut::<Health>(entity)?;
                health.0 -= 10;
                if health.0 <= 0 {
                    registry.kill_entity(entity)?;
                }
            }
        }
        Ok(())
    }
}

impl System for DamageSystem {
    fn state(&self) -> &SystemState { &self.state }
    fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut registry = Registry::new();
    let mut bus = EventBus::new();

    let movement = registry.add_system(MovementSystem::new())?;
    let collision = registry.add_system(CollisionSystem::new())?;
    let damage = registry.add_system(DamageSystem::new())?;

    // Populate the registry!
    {
        const SQRT_NUM_ENTITIES: usize = 4;
        const SCALE: f32 = 2.0 / ((SQRT_NUM_ENTITIES - 1) as f32);

        for x in 0..SQRT_NUM_ENTITIES {
            for y in 0..SQRT_NUM_ENTITIES {
                let x = ((x as f32) * SCALE) - 1.0;
                let y = ((y as f32) * SCALE) - 1.0;

                let body = registry.create_entity();
                let mut body = registry.entity_mut(body)?;
                body.add_component(Position(x * 0.8, y * 0.8))?
                    .add_component(Velocity(y * 0.01, -x * 0.01))?
                    .add_component(BoxCollider { half_width: 0.05, half_height: 0.05 })?
                    .add_component(Health(30))?;
                body.group("bodies")?;
            }
        }

        let projectile = registry.create_entity();
        let mut projectile = registry.entity_mut(projectile)?;
        projectile.add_component(Position(-1.0, 0.0))?
            .add_component(Velocity(0.02, 0.003))?
            .add_component(BoxCollider { half_width: 0.02, half_height: 0.02 })?;
        projectile.tag("bullet")?;
        projectile.group("projectiles")?;
    }

    const SIZE: (i32, i32) = (500, 500);
    const OFFSET: (f32, f32) = (250.0, 250.0);
    const SCALE: (f32, f32) = (200.0, 200.0);
    const NUM_ITER: usize = 100;

    let mut dest = std::io::stdout();
    let mut last_positions = HashMap::new();

    write!(&mut dest, "<?xml version=\"1.0\" standalone=\"no\"?>\n")?;
    write!(&mut dest, "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.0//EN\" \"http://www.w3.org/TR/2001/REC-SVG-20010904/DTD/svg10.dtd\">\n")?;
    write!(&mut dest, "<svg xmlns=\"http://www.w3.org/2000/svg\" height=\"{}\" width=\"{}\">", SIZE.0, SIZE.1)?;
    write!(&mut dest, "<rect width=\"100%\" height=\"100%\" fill=\"black\"/>")?;

    for _ in 0..NUM_ITER {
        for _ in 0..10usize {
            bus.reset();
            DamageSystem::subscribe_to_events(&damage, &mut bus);

            registry.update()?;
            movement.borrow().update(&mut registry)?;
            collision.borrow().update(&registry, &mut bus)?;
            damage.borrow_mut().update(&mut registry)?;
        }

        // Render result!
        for &entity in movement.borrow().system_entities() {
            let Position(x, y) = *registry.get_component::<Position>(entity)?;
            let colour = if registry.entity_has_tag(entity, "bullet") {
                "255,255,0".to_owned()
            } else {
                let health = registry.get_component::<Health>(entity).map_or(0, |h| h.0);
                format!("255,{},{}", 255 - health.clamp(0, 30) * 8, 0)
            };

            if let Some((lx, ly)) = last_positions.get(&entity) {
                let x1 = lx * SCALE.0 + OFFSET.0;
                let y1 = ly * SCALE.1 + OFFSET.1;
                let x2 = x * SCALE.0 + OFFSET.0;
                let y2 = y * SCALE.1 + OFFSET.1;

                write!(&mut dest,
                       "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" style=\"stroke:rgb({});stroke-width:1\" />",
                       x1, y1, x2, y2, colour)?;
            }

            last_positions.insert(entity, (x, y));
        }
    }

    write!(&mut dest, "</svg>")?;

    let survivors = registry.get_entities_by_group("bodies")?;
    tracing::info!(survivors = survivors.len(), "simulation finished");
    Ok(())
}
