//! Print the Cars CustomResourceDefinition as YAML.
//!
//! ```sh
//! cargo run --bin crdgen > config/crd/cars.yaml
//! ```

use cars_operator::crd::Cars;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Cars::crd())?);
    Ok(())
}
