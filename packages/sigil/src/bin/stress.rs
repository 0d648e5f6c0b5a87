use tracing_subscriber::EnvFilter;

use sigil::{component, Registry, System, SystemState};

#[derive(Debug, Clone, Copy, Default)]
pub struct MyComponent(i32);

component!(MyComponent);

struct CountSystem {
    state: SystemState,
}

impl System for CountSystem {
    fn state(&self) -> &SystemState { &self.state }
    fn state_mut(&mut self) -> &mut SystemState { &mut self.state }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::with_capacity(512);
    let counter = registry.add_system(CountSystem {
        state: SystemState::new().requires::<MyComponent>(),
    })?;
    let mut to_kill = Vec::new();

    for _ in 0..8 {
        for entity in to_kill.drain(..) {
            registry.kill_entity(entity)?;
        }

        for idx in 0..512 {
            let entity = registry.create_entity();
            registry.add_component(entity, MyComponent(32))?;

            if idx % 12 == 11 {
                to_kill.push(entity);
            }
        }

        registry.update()?;
        println!("alive: {}, allocated: {}, tracked: {}",
                 registry.alive_count(),
                 registry.entity_count(),
                 counter.borrow().system_entities().len());
    }

    println!("{:?}", registry);
    Ok(())
}
