//! Built-in templates

/// Vagrant option file read by the Vagrantfile on the host
pub const VAGRANT_CONFIG: &str = r#"# -*- mode: ruby -*-
# # vi: set ft=ruby :
# Generated by devstack-bootstrap; edit the YAML options instead.

{% if vm.hostname %}
$hostname = {{ vm.hostname|rbquote }}
{% else %}
# $hostname = "dev"
{% endif %}

{% if vm.forwarded_port %}
$forwarded_port = {
{% for guest_port, host_port in vm.forwarded_port|items %}
  {{ guest_port }} => {{ host_port }}{% if not loop.last %},{% endif %}

{% endfor %}
}
{% else %}
# $forwarded_port = { 8795 => 8795 }
{% endif %}

$ubuntu_box = {{ vm.ubuntu_box|rbquote }}
$fedora_box = {{ vm.fedora_box|rbquote }}
$package_proxy = {% if vm.package_proxy %}{{ vm.package_proxy|rbquote }}{% else %}nil{% endif %}

$install_devstack = {{ vm.install_devstack }}
$install_build_deps = {{ vm.install_build_deps }}
$install_tmate = {{ vm.install_tmate }}
$install_rally = {{ vm.install_rally }}
$vm_memory = {{ vm.vm_memory }}
$vm_cpus = {{ vm.vm_cpus }}
"#;

/// Shell provisioner equivalent to `devstack-bootstrap provision`
pub const SHELL_PROVISIONER: &str = r#"#!/bin/bash
set -e

{% if vm.package_proxy %}
export http_proxy={{ vm.package_proxy|shquote }}
export https_proxy={{ vm.package_proxy|shquote }}
{% endif %}
export DEBIAN_FRONTEND=noninteractive
{ {{ sudo }}apt-get -qqy update && {{ sudo }}apt-get install -qqy {{ packages.apt|join(" ") }}; } || { {{ sudo }}yum -q -y makecache && {{ sudo }}yum install -q -y {{ packages.yum|join(" ") }}; }

cd {{ guest.home|shquote }}
{% if guest.gitconfig %}

cat << 'GITCONFIG' > {{ guest.gitconfig_path|shquote }}
{{ guest.gitconfig }}
GITCONFIG
{% endif %}

test -d {{ guest.devstack_dir|shquote }} || git clone {{ guest.devstack_repo|shquote }} {{ guest.devstack_dir|shquote }}
{% if vm.install_rally %}
test -d {{ guest.rally_dir|shquote }} || git clone {{ guest.rally_repo|shquote }} {{ guest.rally_dir|shquote }}
{% endif %}

mkdir -p {{ guest.bin_dir|shquote }}

cat << 'REFRESH' > {{ guest.refresh_script|shquote }}
#!/bin/bash
set -e

rsync -a{% for pattern in guest.excludes %} --exclude={{ pattern|shquote }}{% endfor %} {{ (guest.home ~ "/" ~ guest.project)|shquote }} {{ guest.stack_dir|shquote }}
{% for sibling in guest.siblings %}

if [ -d {{ (guest.home ~ "/" ~ sibling)|shquote }} ]; then
    rsync -a{% for pattern in guest.excludes %} --exclude={{ pattern|shquote }}{% endfor %}{% for pattern in guest.sibling_excludes %} --exclude={{ pattern|shquote }}{% endfor %} {{ (guest.home ~ "/" ~ sibling)|shquote }} {{ guest.stack_dir|shquote }}
fi
{% endfor %}
{% for sample in guest.config_samples %}

if [ ! -f {{ (guest.devstack_dir ~ "/" ~ sample)|shquote }} ]; then
    cp {{ (guest.stack_plugin_dir ~ "/" ~ sample)|shquote }} {{ (guest.devstack_dir ~ "/" ~ sample)|shquote }}
fi
{% endfor %}

mkdir -p {{ (guest.devstack_dir ~ "/lib")|shquote }}
for f in {{ (guest.home ~ "/" ~ guest.project ~ "/devstack/lib")|shquote }}/*; do
    name=$(basename "$f")
    if [ ! -f {{ (guest.devstack_dir ~ "/lib")|shquote }}/"$name" ]; then
        ln -fs {{ (guest.stack_plugin_dir ~ "/lib")|shquote }}/"$name" {{ (guest.devstack_dir ~ "/lib")|shquote }}/"$name"
    fi
done
REFRESH

chmod +x {{ guest.refresh_script|shquote }}

touch {{ guest.bash_aliases|shquote }}
{% for line in guest.aliases %}
grep -qxF {{ line|shquote }} {{ guest.bash_aliases|shquote }} || echo {{ line|shquote }} >> {{ guest.bash_aliases|shquote }}
{% endfor %}

{{ guest.refresh_script|shquote }}
{% if vm.install_devstack %}

cd {{ guest.devstack_dir|shquote }} && ./stack.sh
{% endif %}
"#;

/// Launcher installed as ~/bin/refresh_devstack.sh
pub const REFRESH_LAUNCHER: &str = r#"#!/bin/bash
exec {{ binary|shquote }} refresh --config-dir {{ config_dir|shquote }} "$@"
"#;
