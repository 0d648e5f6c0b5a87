use tracing_subscriber::EnvFilter;

use sigil::{component, Registry, System, SystemState};

#[derive(Debug, Clone, Copy, Default)]
pub struct Position(f32, f32);

#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity(f32, f32);

component!(Position, Velocity);

struct MovementSystem {
    state: SystemState,
}

impl MovementSystem {
    fn new() -> MovementSystem {
        MovementSystem {
            state: SystemState::new().requires::<Position>().requires::<Velocity>(),
        }
    }

    fn update(&self, registry: &mut Registry, dt: f32) -> sigil::Result<()> {
        for &entity in self.system_entities() {
            let Velocity(vx, vy) = *registry.get_component::<Velocity>(entity)?;
            let position = registry.get_component_mut::<Position>(entity)?;
            position.0 += vx * dt;
            position.1 += vy * dt;
        }
        Ok(())
    }
}

impl System for MovementSystem {
    fn state(&self) -> &SystemState { &self.state }
    fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::new();
    let movement = registry.add_system(MovementSystem::new())?;

    let tank = registry.create_entity();
    registry.entity_mut(tank)?
        .add_component(Position(10.0, 30.0))?
        .add_component(Velocity(50.0, 0.0))?;

    let truck = registry.create_entity();
    registry.add_component(truck, Position(10.0, 30.0))?;

    for _ in 0..3 {
        registry.update()?;
        movement.borrow().update(&mut registry, 0.5)?;
    }

    println!("movement: {:?}", movement.borrow().system_entities());
    println!("tank: {:?}", registry.get_component::<Position>(tank)?);
    println!("truck: {:?}", registry.get_component::<Position>(truck)?);

    registry.kill_entity(tank)?;
    registry.update()?;
    println!("movement after kill: {:?}", movement.borrow().system_entities());

    let replacement = registry.create_entity();
    println!("replacement: {:?} (reuses {:?})", replacement, tank);
    println!("{:?}", registry);
    Ok(())
}
