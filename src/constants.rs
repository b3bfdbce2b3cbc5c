//! # Constants
//!
//! Fixed names, images, ports and process defaults used across the operator.
//!
//! The child object names, ports, secret names and the discriminator label form a
//! compatibility contract with existing clusters. Changing any of them orphans objects
//! created by earlier versions of the operator.

/// Container image for the CARS application when `spec.image` is not set
pub const DEFAULT_IMAGE: &str = "docker.io/galtbv/cars:latest";

/// Container image for the MySQL companion
pub const MYSQL_IMAGE: &str = "mysql:8.0";

/// Port the CARS application listens on
pub const CARS_PORT: i32 = 7777;

/// Port MySQL listens on
pub const MYSQL_PORT: i32 = 3306;

/// Name of the CARS Deployment, Service and Ingress
pub const CARS_NAME: &str = "cars";

/// Name of the MySQL Deployment and Service
pub const MYSQL_NAME: &str = "mysql";

/// Name of the MySQL data PersistentVolumeClaim (also the pod volume name)
pub const MYSQL_DATA_NAME: &str = "mysql-data";

/// Where the MySQL container mounts its data volume
pub const MYSQL_DATA_MOUNT_PATH: &str = "/var/lib/mysql";

/// Secret holding the CARS application environment
pub const CARS_ENV_SECRET: &str = "cars-environment";

/// Secret holding the MySQL environment (root password, database, user)
pub const MYSQL_ENV_SECRET: &str = "mysql-environment";

/// Secret cert-manager writes the ingress certificate into
pub const CARS_TLS_SECRET: &str = "cars-tls";

/// Discriminator label placed on every object this operator owns
pub const CARS_LABEL: &str = "infra.bsvblockchain.com/cars";

/// Value of the discriminator label
pub const CARS_LABEL_VALUE: &str = "true";

/// Annotation that asks cert-manager to issue a certificate for an ingress
pub const CLUSTER_ISSUER_ANNOTATION: &str = "cert-manager.io/cluster-issuer";

/// Ingress class the CARS ingress is served by
pub const INGRESS_CLASS: &str = "nginx";

/// Storage requested by a freshly created MySQL claim
pub const DEFAULT_STORAGE_REQUEST: &str = "5Gi";

/// Field manager recorded on every write
pub const DEFAULT_FIELD_MANAGER: &str = "cars-operator";

/// Delay before a failed pass is retried (seconds)
pub const DEFAULT_ERROR_REQUEUE_SECS: u64 = 1;

/// Upper bound accepted for the error requeue delay (seconds)
pub const MAX_ERROR_REQUEUE_SECS: u64 = 300;

/// HTTP port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// How long to wait for the HTTP server to bind (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// How often to poll the HTTP server during start-up (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
